use serde::Deserialize;
use ts_rs::TS;

use super::entities::ReviewAssignmentStatus;

/// 批量分配互评请求
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct AssignReviewsRequest {
    // 每份提交需要的评审数，缺省时使用作业配置
    pub reviews_per_submission: Option<i32>,
}

/// 手动分配单条互评任务
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct CreateReviewAssignmentRequest {
    pub submission_id: i64,
    pub reviewer_id: i64,
}

/// 待评审列表查询参数
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct PendingReviewsQuery {
    pub course_instance_id: Option<i64>,
}

/// 更新互评任务状态
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct UpdateReviewStatusRequest {
    pub status: ReviewAssignmentStatus,
}

/// 提交评审
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct SubmitReviewRequest {
    pub score: Option<f64>,
    pub comments: Option<String>,
}
