//! 互评任务状态流转
//!
//! 状态表见 [`ReviewAssignmentStatus::can_transition_to`]。所有写入都是条件更新，
//! 只有当前状态仍属于合法来源时才会生效。

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

use super::PeerReviewService;
use super::anonymity::review_assignment_view;
use crate::errors::{PeerReviewError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::peer_reviews::entities::{NewReview, ReviewAssignment, ReviewAssignmentStatus};
use crate::models::peer_reviews::requests::SubmitReviewRequest;
use crate::models::peer_reviews::responses::{
    ReviewAssignmentResponse, ReviewAssignmentView, ReviewResponse,
};
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::User;

async fn load_review_assignment(
    service: &PeerReviewService,
    id: i64,
) -> Result<ReviewAssignment> {
    service
        .storage()
        .get_review_assignment_by_id(id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("互评任务不存在: {id}")))
}

/// 评审人的待办列表；已过期的任务在此持久化为逾期并从结果中剔除
pub async fn get_pending_reviews(
    service: &PeerReviewService,
    reviewer_id: i64,
    course_instance_id: Option<i64>,
) -> Result<Vec<ReviewAssignmentView>> {
    let storage = service.storage();
    let now = Utc::now();

    let rows = storage
        .list_review_assignments_by_reviewer(reviewer_id, course_instance_id)
        .await?;

    let mut pending = Vec::new();
    for row in rows.into_iter().filter(|r| r.status.is_pending()) {
        if row.is_past_deadline(now) {
            let promoted = storage
                .transition_review_assignment_status(
                    row.id,
                    ReviewAssignmentStatus::pending_states(),
                    ReviewAssignmentStatus::Overdue,
                )
                .await?;
            if promoted {
                info!("互评任务 {} 已逾期", row.id);
            }
            continue;
        }
        pending.push(row);
    }

    // 组装视图所需的提交、作业与提交者
    let mut submissions: HashMap<i64, Submission> = HashMap::new();
    let mut assignments: HashMap<i64, Assignment> = HashMap::new();
    for row in &pending {
        if submissions.contains_key(&row.submission_id) {
            continue;
        }
        let Some(submission) = storage.get_submission_by_id(row.submission_id).await? else {
            continue;
        };
        if !assignments.contains_key(&submission.assignment_id) {
            if let Some(assignment) = storage
                .get_assignment_by_id(submission.assignment_id)
                .await?
            {
                assignments.insert(assignment.id, assignment);
            }
        }
        submissions.insert(submission.id, submission);
    }

    let mut submitter_ids: Vec<i64> = submissions.values().map(|s| s.submitter_id).collect();
    submitter_ids.sort_unstable();
    submitter_ids.dedup();
    let users: HashMap<i64, User> = storage
        .list_users_by_ids(&submitter_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let views = pending
        .iter()
        .filter_map(|row| {
            let submission = submissions.get(&row.submission_id)?;
            let assignment = assignments.get(&submission.assignment_id)?;
            Some(review_assignment_view(
                row,
                assignment,
                submission,
                users.get(&submission.submitter_id),
                &service.anonymous_name,
                now,
            ))
        })
        .collect();

    Ok(views)
}

pub async fn list_by_submission(
    service: &PeerReviewService,
    submission_id: i64,
) -> Result<Vec<ReviewAssignmentResponse>> {
    let storage = service.storage();

    if storage.get_submission_by_id(submission_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "提交不存在: {submission_id}"
        )));
    }

    let now = Utc::now();
    Ok(storage
        .list_review_assignments_by_submission(submission_id)
        .await?
        .iter()
        .map(|row| ReviewAssignmentResponse::from_assignment(row, now))
        .collect())
}

pub async fn list_by_assignment(
    service: &PeerReviewService,
    assignment_id: i64,
) -> Result<Vec<ReviewAssignmentResponse>> {
    let storage = service.storage();

    if storage.get_assignment_by_id(assignment_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "作业不存在: {assignment_id}"
        )));
    }

    let now = Utc::now();
    Ok(storage
        .list_review_assignments_by_assignment(assignment_id)
        .await?
        .iter()
        .map(|row| ReviewAssignmentResponse::from_assignment(row, now))
        .collect())
}

pub async fn get_review_assignment(
    service: &PeerReviewService,
    id: i64,
) -> Result<ReviewAssignmentResponse> {
    let row = load_review_assignment(service, id).await?;
    Ok(ReviewAssignmentResponse::from_assignment(&row, Utc::now()))
}

pub async fn start_review(
    service: &PeerReviewService,
    id: i64,
) -> Result<ReviewAssignmentResponse> {
    update_status(service, id, ReviewAssignmentStatus::InProgress).await
}

/// 手动状态变更；Completed 只能通过提交评审到达
pub async fn update_status(
    service: &PeerReviewService,
    id: i64,
    next: ReviewAssignmentStatus,
) -> Result<ReviewAssignmentResponse> {
    if next == ReviewAssignmentStatus::Completed {
        return Err(PeerReviewError::validation(
            "只能通过提交评审将任务标记为已完成",
        ));
    }

    let storage = service.storage();
    let now = Utc::now();
    let mut row = load_review_assignment(service, id).await?;

    if !row.status.can_transition_to(next) {
        return Err(PeerReviewError::invalid_transition(format!(
            "互评任务 {id} 不能从 {} 变更为 {next}",
            row.status
        )));
    }

    match next {
        ReviewAssignmentStatus::Overdue if !row.is_past_deadline(now) => {
            return Err(PeerReviewError::invalid_transition(format!(
                "互评任务 {id} 尚未超过截止时间"
            )));
        }
        ReviewAssignmentStatus::InProgress if row.is_past_deadline(now) => {
            // 已过期的任务顺带落库为逾期
            storage
                .transition_review_assignment_status(
                    id,
                    ReviewAssignmentStatus::pending_states(),
                    ReviewAssignmentStatus::Overdue,
                )
                .await?;
            return Err(PeerReviewError::invalid_transition(format!(
                "互评任务 {id} 已逾期"
            )));
        }
        _ => {}
    }

    let updated = storage
        .transition_review_assignment_status(id, &[row.status], next)
        .await?;
    if !updated {
        return Err(PeerReviewError::conflict(format!(
            "互评任务 {id} 的状态已被其他操作修改"
        )));
    }

    debug!("互评任务 {} 状态: {} -> {}", id, row.status, next);
    row.status = next;

    Ok(ReviewAssignmentResponse::from_assignment(&row, now))
}

/// 提交评审：写入评审记录并在同一事务中完成任务
pub async fn submit_review(
    service: &PeerReviewService,
    id: i64,
    req: SubmitReviewRequest,
) -> Result<ReviewResponse> {
    if let Some(score) = req.score {
        if !score.is_finite() || score < 0.0 {
            return Err(PeerReviewError::validation(format!("评分无效: {score}")));
        }
    }

    let row = load_review_assignment(service, id).await?;
    if row.status == ReviewAssignmentStatus::Completed {
        return Err(PeerReviewError::conflict(format!("互评任务 {id} 已完成")));
    }

    let review = service
        .storage()
        .create_review(NewReview {
            review_assignment_id: id,
            score: req.score,
            comments: req.comments,
        })
        .await?
        .ok_or_else(|| PeerReviewError::conflict(format!("互评任务 {id} 已完成")))?;

    info!(
        "互评任务 {} 已提交评审 (reviewer={}, late={})",
        id,
        row.reviewer_id,
        row.effective_status(Utc::now()) == ReviewAssignmentStatus::Overdue
    );

    Ok(ReviewResponse::from(review))
}
