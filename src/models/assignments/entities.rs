use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 作业元数据（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub course_instance_id: i64,
    pub title: String,
    // 提交截止时间
    pub deadline: Option<DateTime<Utc>>,
    // 互评截止时间
    pub review_deadline: Option<DateTime<Utc>>,
    // 每份提交需要的互评数
    pub num_peer_reviews_required: i32,
    // 是否匿名互评
    pub is_blind_review: bool,
}

impl Assignment {
    /// 互评任务的截止时间：优先使用互评截止时间，未设置时回退到提交截止时间
    pub fn review_due_at(&self) -> Option<DateTime<Utc>> {
        self.review_deadline.or(self.deadline)
    }
}
