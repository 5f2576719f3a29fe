use crate::config::AppConfig;
use crate::services::PeerReviewService;
use crate::storage::Storage;
use actix_web::web;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StartupContext {
    // 所有 worker 共享同一个服务实例（分配锁需要进程内唯一）
    pub peer_reviews: web::Data<PeerReviewService>,
}

/// 准备服务器启动的上下文
/// 包括存储与互评服务
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::get();

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let policy = &config.peer_review;
    info!(
        "Peer review policy: current cap x{}, passed cap x{}",
        policy.current_cap_multiplier, policy.passed_cap_multiplier
    );
    if policy.passed_cap_multiplier == 0 {
        warn!("passed_cap_multiplier is 0, fallback to passed students is disabled");
    }

    let storage: Arc<dyn Storage> = storage;
    let peer_reviews = web::Data::new(PeerReviewService::new(storage, policy));

    StartupContext { peer_reviews }
}
