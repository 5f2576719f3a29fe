//! 互评任务台账存储操作

use super::SeaOrmStorage;
use crate::entity::assignments::Column as AssignmentColumn;
use crate::entity::review_assignments::{ActiveModel, Column, Entity as ReviewAssignments, Relation};
use crate::entity::reviews::{Column as ReviewColumn, Entity as Reviews};
use crate::entity::submissions::{Column as SubmissionColumn, Relation as SubmissionRelation};
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::{
    NewReviewAssignment, ReviewAssignment, ReviewAssignmentStatus,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 插入互评任务（唯一索引冲突时跳过）
    pub async fn insert_review_assignment_if_absent_impl(
        &self,
        new: NewReviewAssignment,
    ) -> Result<Option<ReviewAssignment>> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            submission_id: Set(new.submission_id),
            reviewer_id: Set(new.reviewer_id),
            status: Set(ReviewAssignmentStatus::Assigned.to_string()),
            assigned_at: Set(now),
            deadline: Set(new.deadline.map(|dt| dt.timestamp())),
            is_ai_review: Set(new.is_ai_review),
            ..Default::default()
        };

        let inserted = ReviewAssignments::insert(model)
            .on_conflict(
                OnConflict::columns([Column::SubmissionId, Column::ReviewerId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        // 冲突时不同后端可能返回 0 行或 RecordNotInserted
        match inserted {
            Ok(0) | Err(DbErr::RecordNotInserted) => return Ok(None),
            Ok(_) => {}
            Err(e) => {
                return Err(PeerReviewError::database_operation(format!(
                    "创建互评任务失败: {e}"
                )));
            }
        }

        let result = ReviewAssignments::find()
            .filter(Column::SubmissionId.eq(new.submission_id))
            .filter(Column::ReviewerId.eq(new.reviewer_id))
            .one(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询互评任务失败: {e}")))?;

        Ok(result.map(|m| m.into_review_assignment()))
    }

    /// 通过 ID 获取互评任务
    pub async fn get_review_assignment_by_id_impl(
        &self,
        id: i64,
    ) -> Result<Option<ReviewAssignment>> {
        let result = ReviewAssignments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询互评任务失败: {e}")))?;

        Ok(result.map(|m| m.into_review_assignment()))
    }

    /// 列出某提交的互评任务
    pub async fn list_review_assignments_by_submission_impl(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ReviewAssignment>> {
        let results = ReviewAssignments::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询互评任务失败: {e}")))?;

        Ok(results
            .into_iter()
            .map(|m| m.into_review_assignment())
            .collect())
    }

    /// 列出某作业的互评任务（join submissions 表）
    pub async fn list_review_assignments_by_assignment_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<ReviewAssignment>> {
        let results = ReviewAssignments::find()
            .join(JoinType::InnerJoin, Relation::Submission.def())
            .filter(SubmissionColumn::AssignmentId.eq(assignment_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询互评任务失败: {e}")))?;

        Ok(results
            .into_iter()
            .map(|m| m.into_review_assignment())
            .collect())
    }

    /// 列出评审人的互评任务
    pub async fn list_review_assignments_by_reviewer_impl(
        &self,
        reviewer_id: i64,
        course_instance_id: Option<i64>,
    ) -> Result<Vec<ReviewAssignment>> {
        let mut select = ReviewAssignments::find().filter(Column::ReviewerId.eq(reviewer_id));

        // 课程筛选：review_assignments -> submissions -> assignments
        if let Some(course_instance_id) = course_instance_id {
            select = select
                .join(JoinType::InnerJoin, Relation::Submission.def())
                .join(JoinType::InnerJoin, SubmissionRelation::Assignment.def())
                .filter(AssignmentColumn::CourseInstanceId.eq(course_instance_id));
        }

        let results = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询待评审任务失败: {e}")))?;

        Ok(results
            .into_iter()
            .map(|m| m.into_review_assignment())
            .collect())
    }

    /// 条件更新任务状态，重复执行不会产生副作用
    pub async fn transition_review_assignment_status_impl(
        &self,
        id: i64,
        from: &[ReviewAssignmentStatus],
        to: ReviewAssignmentStatus,
    ) -> Result<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        let result = ReviewAssignments::update_many()
            .col_expr(Column::Status, Expr::value(to.to_string()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.is_in(from.iter().map(|s| s.to_string())))
            .exec(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("更新互评任务状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 删除互评任务：先删评审记录，再删任务本身
    pub async fn delete_review_assignment_impl(&self, id: i64) -> Result<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("开启事务失败: {e}")))?;

        Reviews::delete_many()
            .filter(ReviewColumn::ReviewAssignmentId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("删除评审记录失败: {e}")))?;

        let result = ReviewAssignments::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("删除互评任务失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}
