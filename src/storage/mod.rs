use std::sync::Arc;

use crate::models::{
    assignments::entities::Assignment,
    peer_reviews::entities::{
        NewReview, NewReviewAssignment, Review, ReviewAssignment, ReviewAssignmentStatus,
    },
    rosters::entities::RosterEntry,
    submissions::entities::Submission,
    users::entities::User,
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 外部数据只读查询
    // 通过ID获取作业元数据
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;
    // 列出作业的全部提交（按 ID 升序）
    async fn list_submissions_by_assignment(&self, assignment_id: i64) -> Result<Vec<Submission>>;
    // 获取课程名册
    async fn get_course_roster(&self, course_instance_id: i64) -> Result<Vec<RosterEntry>>;
    // 通过ID获取用户
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>>;
    // 批量获取用户
    async fn list_users_by_ids(&self, user_ids: &[i64]) -> Result<Vec<User>>;

    /// 互评任务台账
    // 插入互评任务；(提交, 评审人) 已存在时不插入并返回 None
    async fn insert_review_assignment_if_absent(
        &self,
        new: NewReviewAssignment,
    ) -> Result<Option<ReviewAssignment>>;
    // 通过ID获取互评任务
    async fn get_review_assignment_by_id(&self, id: i64) -> Result<Option<ReviewAssignment>>;
    // 列出某提交的互评任务
    async fn list_review_assignments_by_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ReviewAssignment>>;
    // 列出某作业的互评任务
    async fn list_review_assignments_by_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<ReviewAssignment>>;
    // 列出评审人的互评任务，可按课程实例过滤
    async fn list_review_assignments_by_reviewer(
        &self,
        reviewer_id: i64,
        course_instance_id: Option<i64>,
    ) -> Result<Vec<ReviewAssignment>>;
    // 条件更新状态：仅当当前状态属于 `from` 时写入，返回是否有行被更新
    async fn transition_review_assignment_status(
        &self,
        id: i64,
        from: &[ReviewAssignmentStatus],
        to: ReviewAssignmentStatus,
    ) -> Result<bool>;
    // 删除互评任务（先删除其评审记录）
    async fn delete_review_assignment(&self, id: i64) -> Result<bool>;

    /// 评审记录
    // 写入评审记录并将任务标记为已完成；任务已完成时返回 None
    async fn create_review(&self, new: NewReview) -> Result<Option<Review>>;
    // 列出某互评任务的评审记录
    async fn list_reviews_by_review_assignment(
        &self,
        review_assignment_id: i64,
    ) -> Result<Vec<Review>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
