pub mod allocation;
pub mod anonymity;
pub mod assign;
pub mod delete;
pub mod lifecycle;
pub mod stats;

#[cfg(test)]
mod tests;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::PeerReviewConfig;
use crate::errors::Result;
use crate::models::peer_reviews::entities::ReviewAssignmentStatus;
use crate::models::peer_reviews::requests::{CreateReviewAssignmentRequest, SubmitReviewRequest};
use crate::models::peer_reviews::responses::{
    AssignReviewsResponse, PeerReviewStats, ReviewAssignmentResponse, ReviewAssignmentView,
    ReviewResponse,
};
use crate::storage::Storage;
use allocation::AllocationPolicy;

pub struct PeerReviewService {
    storage: Arc<dyn Storage>,
    policy: AllocationPolicy,
    anonymous_name: String,
    // 按作业 ID 串行化分配流程
    assignment_locks: DashMap<i64, Arc<Mutex<()>>>,
}

pub(crate) struct AssignmentLease<'a> {
    service: &'a PeerReviewService,
    assignment_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AssignmentLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // 仅剩表内引用时说明没有其他等待者
        self.service
            .assignment_locks
            .remove_if(&self.assignment_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl PeerReviewService {
    pub fn new(storage: Arc<dyn Storage>, config: &PeerReviewConfig) -> Self {
        Self {
            storage,
            policy: AllocationPolicy::from(config),
            anonymous_name: config.anonymous_name.clone(),
            assignment_locks: DashMap::new(),
        }
    }

    pub(crate) fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    /// 获取作业级互斥锁，返回的租约释放时一并清理无人等待的锁条目
    pub(crate) async fn lock_assignment(&self, assignment_id: i64) -> AssignmentLease<'_> {
        let lock = self
            .assignment_locks
            .entry(assignment_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;

        AssignmentLease {
            service: self,
            assignment_id,
            guard: Some(guard),
        }
    }

    pub async fn assign_reviews(
        &self,
        assignment_id: i64,
        reviews_per_submission: Option<i32>,
    ) -> Result<AssignReviewsResponse> {
        assign::assign_reviews(self, assignment_id, reviews_per_submission).await
    }

    pub async fn handle_new_submission(
        &self,
        submission_id: i64,
    ) -> Result<Option<AssignReviewsResponse>> {
        assign::handle_new_submission(self, submission_id).await
    }

    pub async fn create_review_assignment(
        &self,
        req: CreateReviewAssignmentRequest,
    ) -> Result<ReviewAssignmentResponse> {
        assign::create_review_assignment(self, req).await
    }

    pub async fn get_pending_reviews(
        &self,
        reviewer_id: i64,
        course_instance_id: Option<i64>,
    ) -> Result<Vec<ReviewAssignmentView>> {
        lifecycle::get_pending_reviews(self, reviewer_id, course_instance_id).await
    }

    pub async fn list_by_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ReviewAssignmentResponse>> {
        lifecycle::list_by_submission(self, submission_id).await
    }

    pub async fn list_by_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<ReviewAssignmentResponse>> {
        lifecycle::list_by_assignment(self, assignment_id).await
    }

    pub async fn get_review_assignment(&self, id: i64) -> Result<ReviewAssignmentResponse> {
        lifecycle::get_review_assignment(self, id).await
    }

    pub async fn start_review(&self, id: i64) -> Result<ReviewAssignmentResponse> {
        lifecycle::start_review(self, id).await
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: ReviewAssignmentStatus,
    ) -> Result<ReviewAssignmentResponse> {
        lifecycle::update_status(self, id, status).await
    }

    pub async fn submit_review(&self, id: i64, req: SubmitReviewRequest) -> Result<ReviewResponse> {
        lifecycle::submit_review(self, id, req).await
    }

    pub async fn get_statistics(&self, assignment_id: i64) -> Result<PeerReviewStats> {
        stats::get_statistics(self, assignment_id).await
    }

    pub async fn delete_assignment(&self, id: i64) -> Result<()> {
        delete::delete_assignment(self, id).await
    }
}
