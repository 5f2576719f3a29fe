use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::PeerReviewService;
use super::allocation::{ledger_coverage, plan_allocation};
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::NewReviewAssignment;
use crate::models::peer_reviews::requests::CreateReviewAssignmentRequest;
use crate::models::peer_reviews::responses::{AssignReviewsResponse, ReviewAssignmentResponse};
use crate::models::rosters::entities::Roster;

pub async fn assign_reviews(
    service: &PeerReviewService,
    assignment_id: i64,
    reviews_per_submission: Option<i32>,
) -> Result<AssignReviewsResponse> {
    // 每次调用使用独立的随机源
    let mut rng = StdRng::from_rng(&mut rand::rng());
    assign_reviews_with_rng(service, assignment_id, reviews_per_submission, &mut rng).await
}

pub async fn assign_reviews_with_rng<R: Rng + Send>(
    service: &PeerReviewService,
    assignment_id: i64,
    reviews_per_submission: Option<i32>,
    rng: &mut R,
) -> Result<AssignReviewsResponse> {
    let storage = service.storage();

    let assignment = storage
        .get_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("作业不存在: {assignment_id}")))?;

    let target = reviews_per_submission.unwrap_or(assignment.num_peer_reviews_required);
    if target <= 0 {
        return Err(PeerReviewError::validation(format!(
            "每份提交的评审数必须为正数: {target}"
        )));
    }

    let submissions = storage.list_submissions_by_assignment(assignment_id).await?;
    if submissions.is_empty() {
        return Err(PeerReviewError::validation("该作业还没有任何提交"));
    }

    let _lease = service.lock_assignment(assignment_id).await;

    // 名册与已有任务在持锁后读取，负载以此为准
    let roster = Roster::partition(
        &storage
            .get_course_roster(assignment.course_instance_id)
            .await?,
    );
    let existing = storage
        .list_review_assignments_by_assignment(assignment_id)
        .await?;

    let plan = plan_allocation(
        &submissions,
        &roster,
        &existing,
        target as usize,
        &service.policy,
        rng,
    );

    let deadline = assignment.review_due_at();
    let mut assigned_count = 0i64;
    for planned in &plan.planned {
        let inserted = storage
            .insert_review_assignment_if_absent(NewReviewAssignment {
                submission_id: planned.submission_id,
                reviewer_id: planned.reviewer_id,
                deadline,
                is_ai_review: false,
            })
            .await?;

        match inserted {
            Some(_) => assigned_count += 1,
            None => debug!(
                "互评任务已存在，跳过: submission={}, reviewer={}",
                planned.submission_id, planned.reviewer_id
            ),
        }
    }

    // 覆盖情况以写入后的台账为准，被拒绝的插入不计入
    let rows = storage
        .list_review_assignments_by_assignment(assignment_id)
        .await?;
    let report = ledger_coverage(&submissions, &roster, &rows, target as usize);

    let under_served = report.under_served_submission_ids.len();
    if under_served > 0 {
        warn!(
            "作业 {} 有 {} 份提交未达到目标评审数 {}（在读 {} 人，已通过 {} 人）",
            assignment_id,
            under_served,
            target,
            roster.current.len(),
            roster.passed.len()
        );
    }
    info!(
        "作业 {} 互评分配完成: 新建 {} 条任务，目标 {} 份/提交",
        assignment_id, assigned_count, target
    );

    Ok(AssignReviewsResponse {
        assignment_id,
        reviews_per_submission: target,
        assigned_count,
        message: format!(
            "已分配 {assigned_count} 份互评任务；{under_served} 份提交仍未达到目标"
        ),
        under_served_submission_ids: report.under_served_submission_ids,
        coverage: report.coverage,
    })
}

/// 新提交到达后按作业配置补充分配
pub async fn handle_new_submission(
    service: &PeerReviewService,
    submission_id: i64,
) -> Result<Option<AssignReviewsResponse>> {
    let storage = service.storage();

    let submission = storage
        .get_submission_by_id(submission_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("提交不存在: {submission_id}")))?;

    let assignment = storage
        .get_assignment_by_id(submission.assignment_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::not_found(format!("作业不存在: {}", submission.assignment_id))
        })?;

    if assignment.num_peer_reviews_required <= 0 {
        debug!("作业 {} 未启用互评，跳过分配", assignment.id);
        return Ok(None);
    }

    assign_reviews(service, assignment.id, None).await.map(Some)
}

/// 手动指派单条互评任务
pub async fn create_review_assignment(
    service: &PeerReviewService,
    req: CreateReviewAssignmentRequest,
) -> Result<ReviewAssignmentResponse> {
    let storage = service.storage();

    let submission = storage
        .get_submission_by_id(req.submission_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("提交不存在: {}", req.submission_id)))?;

    if storage.get_user_by_id(req.reviewer_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "评审人不存在: {}",
            req.reviewer_id
        )));
    }

    if submission.submitter_id == req.reviewer_id {
        return Err(PeerReviewError::validation("不能评审自己的提交"));
    }

    let assignment = storage
        .get_assignment_by_id(submission.assignment_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::not_found(format!("作业不存在: {}", submission.assignment_id))
        })?;

    let _lease = service.lock_assignment(assignment.id).await;

    let created = storage
        .insert_review_assignment_if_absent(NewReviewAssignment {
            submission_id: submission.id,
            reviewer_id: req.reviewer_id,
            deadline: assignment.review_due_at(),
            is_ai_review: false,
        })
        .await?
        .ok_or_else(|| PeerReviewError::conflict("该评审人已被分配到此提交"))?;

    info!(
        "手动分配互评任务 {}: submission={}, reviewer={}",
        created.id, created.submission_id, created.reviewer_id
    );

    Ok(ReviewAssignmentResponse::from_assignment(
        &created,
        Utc::now(),
    ))
}
