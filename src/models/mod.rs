pub mod assignments;
pub mod common;
pub mod peer_reviews;
pub mod rosters;
pub mod submissions;
pub mod users;

pub use common::error_code::ErrorCode;
pub use common::response::ApiResponse;
