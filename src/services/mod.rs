pub mod peer_reviews;

pub use peer_reviews::PeerReviewService;
