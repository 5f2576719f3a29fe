//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assignments;
mod review_assignments;
mod reviews;
mod rosters;
mod submissions;
mod users;

use crate::config::AppConfig;
use crate::errors::{PeerReviewError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        let storage = Self::from_connection(db).await?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(storage)
    }

    /// 基于已有连接创建存储实例并运行迁移
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self { db })
    }

    /// 单连接内存 SQLite，供测试使用
    #[cfg(test)]
    pub(crate) async fn connect_in_memory() -> Result<Self> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(opt).await.map_err(|e| {
            PeerReviewError::database_connection(format!("SQLite 内存数据库连接失败: {e}"))
        })?;

        Self::from_connection(db).await
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| PeerReviewError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| PeerReviewError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| PeerReviewError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(PeerReviewError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    assignments::entities::Assignment,
    peer_reviews::entities::{
        NewReview, NewReviewAssignment, Review, ReviewAssignment, ReviewAssignmentStatus,
    },
    rosters::entities::RosterEntry,
    submissions::entities::Submission,
    users::entities::User,
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 作业模块
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(assignment_id).await
    }

    // 提交模块
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(submission_id).await
    }

    async fn list_submissions_by_assignment(&self, assignment_id: i64) -> Result<Vec<Submission>> {
        self.list_submissions_by_assignment_impl(assignment_id)
            .await
    }

    // 名册模块
    async fn get_course_roster(&self, course_instance_id: i64) -> Result<Vec<RosterEntry>> {
        self.get_course_roster_impl(course_instance_id).await
    }

    // 用户模块
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(user_id).await
    }

    async fn list_users_by_ids(&self, user_ids: &[i64]) -> Result<Vec<User>> {
        self.list_users_by_ids_impl(user_ids).await
    }

    // 互评任务模块
    async fn insert_review_assignment_if_absent(
        &self,
        new: NewReviewAssignment,
    ) -> Result<Option<ReviewAssignment>> {
        self.insert_review_assignment_if_absent_impl(new).await
    }

    async fn get_review_assignment_by_id(&self, id: i64) -> Result<Option<ReviewAssignment>> {
        self.get_review_assignment_by_id_impl(id).await
    }

    async fn list_review_assignments_by_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ReviewAssignment>> {
        self.list_review_assignments_by_submission_impl(submission_id)
            .await
    }

    async fn list_review_assignments_by_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<ReviewAssignment>> {
        self.list_review_assignments_by_assignment_impl(assignment_id)
            .await
    }

    async fn list_review_assignments_by_reviewer(
        &self,
        reviewer_id: i64,
        course_instance_id: Option<i64>,
    ) -> Result<Vec<ReviewAssignment>> {
        self.list_review_assignments_by_reviewer_impl(reviewer_id, course_instance_id)
            .await
    }

    async fn transition_review_assignment_status(
        &self,
        id: i64,
        from: &[ReviewAssignmentStatus],
        to: ReviewAssignmentStatus,
    ) -> Result<bool> {
        self.transition_review_assignment_status_impl(id, from, to)
            .await
    }

    async fn delete_review_assignment(&self, id: i64) -> Result<bool> {
        self.delete_review_assignment_impl(id).await
    }

    // 评审记录模块
    async fn create_review(&self, new: NewReview) -> Result<Option<Review>> {
        self.create_review_impl(new).await
    }

    async fn list_reviews_by_review_assignment(
        &self,
        review_assignment_id: i64,
    ) -> Result<Vec<Review>> {
        self.list_reviews_by_review_assignment_impl(review_assignment_id)
            .await
    }
}
