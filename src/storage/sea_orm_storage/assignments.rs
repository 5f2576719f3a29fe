//! 作业元数据存储操作（只读）

use super::SeaOrmStorage;
use crate::entity::prelude::Assignments;
use crate::errors::{PeerReviewError, Result};
use crate::models::assignments::entities::Assignment;
use sea_orm::EntityTrait;

impl SeaOrmStorage {
    /// 通过 ID 获取作业
    pub async fn get_assignment_by_id_impl(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        let result = Assignments::find_by_id(assignment_id)
            .one(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询作业失败: {e}")))?;

        Ok(result.map(|m| m.into_assignment()))
    }
}
