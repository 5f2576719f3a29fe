//! 课程名册存储操作（只读）

use super::SeaOrmStorage;
use crate::entity::course_enrollments::Column;
use crate::entity::prelude::CourseEnrollments;
use crate::errors::{PeerReviewError, Result};
use crate::models::rosters::entities::RosterEntry;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

impl SeaOrmStorage {
    /// 获取课程实例的全部名册条目
    pub async fn get_course_roster_impl(&self, course_instance_id: i64) -> Result<Vec<RosterEntry>> {
        let results = CourseEnrollments::find()
            .filter(Column::CourseInstanceId.eq(course_instance_id))
            .order_by_asc(Column::UserId)
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询课程名册失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_roster_entry()).collect())
    }
}
