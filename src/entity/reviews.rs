//! 评审记录实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub review_assignment_id: i64,
    pub score: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub comments: Option<String>,
    pub submitted_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::review_assignments::Entity",
        from = "Column::ReviewAssignmentId",
        to = "super::review_assignments::Column::Id"
    )]
    ReviewAssignment,
}

impl Related<super::review_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_review(self) -> crate::models::peer_reviews::entities::Review {
        use crate::models::peer_reviews::entities::Review;
        use chrono::{DateTime, Utc};

        Review {
            id: self.id,
            review_assignment_id: self.review_assignment_id,
            score: self.score,
            comments: self.comments,
            submitted_at: DateTime::<Utc>::from_timestamp(self.submitted_at, 0)
                .unwrap_or_default(),
        }
    }
}
