use serde::{Deserialize, Serialize};

/// 用户（只读，仅用于响应组装）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    // 学号
    pub student_code: Option<String>,
}

impl User {
    /// 展示名称，未设置时回退到用户名
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
