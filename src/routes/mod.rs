pub mod peer_reviews;

pub use peer_reviews::configure_peer_review_routes;
