use serde::{Deserialize, Serialize};

/// 作业提交（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    // 提交者用户 ID
    pub submitter_id: i64,
    // 上传文件名，可能包含学号等身份信息
    pub file_name: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}
