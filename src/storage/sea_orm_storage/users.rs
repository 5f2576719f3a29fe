//! 用户存储操作（只读）

use super::SeaOrmStorage;
use crate::entity::prelude::Users;
use crate::entity::users::Column;
use crate::errors::{PeerReviewError, Result};
use crate::models::users::entities::User;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

impl SeaOrmStorage {
    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, user_id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 批量查询用户信息
    pub async fn list_users_by_ids_impl(&self, user_ids: &[i64]) -> Result<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let results = Users::find()
            .filter(Column::Id.is_in(user_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("查询用户信息失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_user()).collect())
    }
}
