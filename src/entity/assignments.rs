//! 作业实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_instance_id: i64,
    pub title: String,
    pub deadline: Option<i64>,
    pub review_deadline: Option<i64>,
    pub num_peer_reviews_required: i32,
    pub is_blind_review: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_instances::Entity",
        from = "Column::CourseInstanceId",
        to = "super::course_instances::Column::Id"
    )]
    CourseInstance,
    #[sea_orm(has_many = "super::submissions::Entity")]
    Submissions,
}

impl Related<super::course_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseInstance.def()
    }
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_assignment(self) -> crate::models::assignments::entities::Assignment {
        use crate::models::assignments::entities::Assignment;
        use chrono::{DateTime, Utc};

        Assignment {
            id: self.id,
            course_instance_id: self.course_instance_id,
            title: self.title,
            deadline: self
                .deadline
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            review_deadline: self
                .review_deadline
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            num_peer_reviews_required: self.num_peer_reviews_required,
            is_blind_review: self.is_blind_review,
        }
    }
}
