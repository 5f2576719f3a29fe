//! 选课名册实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_enrollments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_instance_id: i64,
    pub user_id: i64,
    pub is_passed: bool,
    pub status: String,
    pub joined_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_instances::Entity",
        from = "Column::CourseInstanceId",
        to = "super::course_instances::Column::Id"
    )]
    CourseInstance,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::course_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseInstance.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_roster_entry(self) -> crate::models::rosters::entities::RosterEntry {
        use crate::models::rosters::entities::{EnrollmentStatus, RosterEntry};

        RosterEntry {
            user_id: self.user_id,
            course_instance_id: self.course_instance_id,
            is_passed: self.is_passed,
            status: self
                .status
                .parse::<EnrollmentStatus>()
                .unwrap_or(EnrollmentStatus::Dropped),
        }
    }
}
