use crate::errors::PeerReviewError;

/// 业务错误码（写入 ApiResponse.code）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    BadRequest = 1000,
    NotFound = 1004,
    Conflict = 1009,
    InternalServerError = 1500,

    // 互评状态流转
    InvalidStatusTransition = 3005,
}

impl From<&PeerReviewError> for ErrorCode {
    fn from(err: &PeerReviewError) -> Self {
        match err {
            PeerReviewError::Validation(_) => ErrorCode::BadRequest,
            PeerReviewError::NotFound(_) => ErrorCode::NotFound,
            PeerReviewError::Conflict(_) => ErrorCode::Conflict,
            PeerReviewError::InvalidTransition(_) => ErrorCode::InvalidStatusTransition,
            PeerReviewError::DatabaseConfig(_)
            | PeerReviewError::DatabaseConnection(_)
            | PeerReviewError::DatabaseOperation(_) => ErrorCode::InternalServerError,
        }
    }
}
