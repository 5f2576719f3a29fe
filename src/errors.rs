//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_peer_review_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum PeerReviewError {
            $($variant(String),)*
        }

        impl PeerReviewError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(PeerReviewError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(PeerReviewError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(PeerReviewError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl PeerReviewError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        PeerReviewError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_peer_review_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    Validation("E004", "Validation Error"),
    NotFound("E005", "Resource Not Found"),
    Conflict("E006", "Resource Conflict"),
    InvalidTransition("E007", "Invalid Status Transition"),
}

impl PeerReviewError {
    /// 是否属于调用方可以修正的错误（而非服务端故障）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PeerReviewError::Validation(_)
                | PeerReviewError::NotFound(_)
                | PeerReviewError::Conflict(_)
                | PeerReviewError::InvalidTransition(_)
        )
    }

    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for PeerReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for PeerReviewError {}

impl From<sea_orm::DbErr> for PeerReviewError {
    fn from(err: sea_orm::DbErr) -> Self {
        PeerReviewError::DatabaseOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeerReviewError>;
