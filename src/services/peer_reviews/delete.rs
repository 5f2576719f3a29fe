use tracing::info;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};

/// 删除互评任务及其评审记录
pub async fn delete_assignment(service: &PeerReviewService, id: i64) -> Result<()> {
    let storage = service.storage();

    if storage.get_review_assignment_by_id(id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!("互评任务不存在: {id}")));
    }

    // 并发删除时可能已被移除
    if !storage.delete_review_assignment(id).await? {
        return Err(PeerReviewError::not_found(format!("互评任务不存在: {id}")));
    }

    info!("互评任务 {} 已删除", id);
    Ok(())
}
