//! 评审记录存储操作

use super::SeaOrmStorage;
use crate::entity::review_assignments::{Column as ReviewAssignmentColumn, Entity as ReviewAssignments};
use crate::entity::reviews::{ActiveModel, Column, Entity as Reviews};
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::{NewReview, Review, ReviewAssignmentStatus};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 写入评审记录，同一事务内把任务标记为已完成
    pub async fn create_review_impl(&self, new: NewReview) -> Result<Option<Review>> {
        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("开启事务失败: {e}")))?;

        let completable = ReviewAssignmentStatus::sources_of(ReviewAssignmentStatus::Completed);
        let updated = ReviewAssignments::update_many()
            .col_expr(
                ReviewAssignmentColumn::Status,
                Expr::value(ReviewAssignmentStatus::Completed.to_string()),
            )
            .filter(ReviewAssignmentColumn::Id.eq(new.review_assignment_id))
            .filter(ReviewAssignmentColumn::Status.is_in(completable.iter().map(|s| s.to_string())))
            .exec(&txn)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("更新互评任务状态失败: {e}")))?;

        // 任务不存在或已完成
        if updated.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| PeerReviewError::database_operation(format!("回滚事务失败: {e}")))?;
            return Ok(None);
        }

        let model = ActiveModel {
            review_assignment_id: Set(new.review_assignment_id),
            score: Set(new.score),
            comments: Set(new.comments),
            submitted_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&txn)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("创建评审记录失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(Some(result.into_review()))
    }

    /// 列出某互评任务的评审记录
    pub async fn list_reviews_by_review_assignment_impl(
        &self,
        review_assignment_id: i64,
    ) -> Result<Vec<Review>> {
        let results = Reviews::find()
            .filter(Column::ReviewAssignmentId.eq(review_assignment_id))
            .order_by_asc(Column::SubmittedAt)
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询评审记录失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_review()).collect())
    }
}
