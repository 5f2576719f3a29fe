use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::{ReviewAssignment, ReviewAssignmentStatus};
use crate::models::peer_reviews::responses::{
    CoverageStatus, PeerReviewStats, ReviewerLoad, ReviewerPool, SubmissionReviewStats,
};
use crate::models::rosters::entities::{EnrollmentState, Roster};
use crate::models::submissions::entities::Submission;

pub async fn get_statistics(
    service: &PeerReviewService,
    assignment_id: i64,
) -> Result<PeerReviewStats> {
    let storage = service.storage();

    let assignment = storage
        .get_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("作业不存在: {assignment_id}")))?;

    let submissions = storage.list_submissions_by_assignment(assignment_id).await?;
    let roster = Roster::partition(
        &storage
            .get_course_roster(assignment.course_instance_id)
            .await?,
    );
    let rows = storage
        .list_review_assignments_by_assignment(assignment_id)
        .await?;

    debug!(
        "统计作业 {} 的互评情况: {} 份提交, {} 条任务",
        assignment_id,
        submissions.len(),
        rows.len()
    );

    Ok(build_statistics(
        assignment_id,
        assignment.num_peer_reviews_required,
        &submissions,
        &roster,
        &rows,
        Utc::now(),
    ))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 由台账数据聚合统计（只读）
pub fn build_statistics(
    assignment_id: i64,
    target: i32,
    submissions: &[Submission],
    roster: &Roster,
    rows: &[ReviewAssignment],
    now: DateTime<Utc>,
) -> PeerReviewStats {
    let target_count = target.max(0) as i64;
    let peer_rows: Vec<&ReviewAssignment> = rows.iter().filter(|r| !r.is_ai_review).collect();

    let mut by_submission: HashMap<i64, Vec<&ReviewAssignment>> = HashMap::new();
    for row in &peer_rows {
        by_submission.entry(row.submission_id).or_default().push(row);
    }

    let mut ordered: Vec<&Submission> = submissions.iter().collect();
    ordered.sort_by_key(|s| s.id);

    let per_submission: Vec<SubmissionReviewStats> = ordered
        .iter()
        .map(|submission| {
            let rows = by_submission
                .get(&submission.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let in_pool = |state: EnrollmentState| {
                rows.iter()
                    .filter(|r| roster.state_of(r.reviewer_id) == Some(state))
                    .count() as i64
            };
            let total_assigned = rows.len() as i64;

            SubmissionReviewStats {
                submission_id: submission.id,
                submitter_id: submission.submitter_id,
                current_reviewers: in_pool(EnrollmentState::Current),
                passed_reviewers: in_pool(EnrollmentState::Passed),
                total_assigned,
                completed: rows
                    .iter()
                    .filter(|r| r.status == ReviewAssignmentStatus::Completed)
                    .count() as i64,
                status: if total_assigned >= target_count {
                    CoverageStatus::Complete
                } else {
                    CoverageStatus::Incomplete
                },
            }
        })
        .collect();

    // 评审人负载分布
    let mut loads: HashMap<i64, ReviewerLoad> = HashMap::new();
    for row in &peer_rows {
        let load = loads.entry(row.reviewer_id).or_insert_with(|| ReviewerLoad {
            reviewer_id: row.reviewer_id,
            pool: ReviewerPool::from(roster.state_of(row.reviewer_id)),
            assigned: 0,
            completed: 0,
        });
        load.assigned += 1;
        if row.status == ReviewAssignmentStatus::Completed {
            load.completed += 1;
        }
    }
    let mut reviewer_loads: Vec<ReviewerLoad> = loads.into_values().collect();
    reviewer_loads.sort_by(|a, b| {
        b.assigned
            .cmp(&a.assigned)
            .then(a.reviewer_id.cmp(&b.reviewer_id))
    });

    let total_submissions = per_submission.len() as i64;
    let total_assignments = per_submission.iter().map(|s| s.total_assigned).sum::<i64>();
    let average_assignments_per_submission = if total_submissions > 0 {
        round2(total_assignments as f64 / total_submissions as f64)
    } else {
        0.0
    };

    PeerReviewStats {
        assignment_id,
        reviews_per_submission: target,
        total_submissions,
        total_assignments,
        average_assignments_per_submission,
        submissions_meeting_target: per_submission
            .iter()
            .filter(|s| s.status == CoverageStatus::Complete)
            .count() as i64,
        completed_reviews: peer_rows
            .iter()
            .filter(|r| r.status == ReviewAssignmentStatus::Completed)
            .count() as i64,
        overdue_reviews: peer_rows
            .iter()
            .filter(|r| r.effective_status(now) == ReviewAssignmentStatus::Overdue)
            .count() as i64,
        current_student_count: roster.current.len() as i64,
        passed_student_count: roster.passed.len() as i64,
        under_served_submission_ids: per_submission
            .iter()
            .filter(|s| s.status == CoverageStatus::Incomplete)
            .map(|s| s.submission_id)
            .collect(),
        submissions: per_submission,
        reviewer_loads,
    }
}
