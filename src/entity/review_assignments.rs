//! 互评任务实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: String,
    pub assigned_at: i64,
    pub deadline: Option<i64>,
    pub is_ai_review: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id"
    )]
    Submission,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReviewerId",
        to = "super::users::Column::Id"
    )]
    Reviewer,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviewer.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_review_assignment(self) -> crate::models::peer_reviews::entities::ReviewAssignment {
        use crate::models::peer_reviews::entities::{ReviewAssignment, ReviewAssignmentStatus};
        use chrono::{DateTime, Utc};

        ReviewAssignment {
            id: self.id,
            submission_id: self.submission_id,
            reviewer_id: self.reviewer_id,
            status: self
                .status
                .parse::<ReviewAssignmentStatus>()
                .unwrap_or(ReviewAssignmentStatus::Assigned),
            assigned_at: DateTime::<Utc>::from_timestamp(self.assigned_at, 0).unwrap_or_default(),
            deadline: self
                .deadline
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            is_ai_review: self.is_ai_review,
        }
    }
}
