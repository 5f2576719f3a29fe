use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use super::entities::{Review, ReviewAssignment, ReviewAssignmentStatus};
use crate::models::rosters::entities::EnrollmentState;

fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// 评审人来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub enum ReviewerPool {
    Current,
    Passed,
    // 不在名册中（例如教师手动指派的人员）
    External,
}

impl From<Option<EnrollmentState>> for ReviewerPool {
    fn from(state: Option<EnrollmentState>) -> Self {
        match state {
            Some(EnrollmentState::Current) => ReviewerPool::Current,
            Some(EnrollmentState::Passed) => ReviewerPool::Passed,
            None => ReviewerPool::External,
        }
    }
}

/// 单份提交的分配结果
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct SubmissionCoverage {
    pub submission_id: i64,
    pub total_assigned: i64,
    pub from_current: i64,
    pub from_passed: i64,
}

/// 批量分配互评响应
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct AssignReviewsResponse {
    pub assignment_id: i64,
    pub reviews_per_submission: i32,
    // 本次新建的任务数
    pub assigned_count: i64,
    // 仍未达到目标评审数的提交
    pub under_served_submission_ids: Vec<i64>,
    pub coverage: Vec<SubmissionCoverage>,
    pub message: String,
}

/// 评审人视角下的提交者信息（匿名评审时已脱敏）
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct SubmitterView {
    pub user_id: Option<i64>,
    pub display_name: String,
    pub student_code: Option<String>,
    pub email: Option<String>,
    pub is_anonymous: bool,
}

/// 评审人视角的互评任务
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct ReviewAssignmentView {
    pub id: i64,
    pub submission_id: i64,
    pub assignment_id: i64,
    pub assignment_title: String,
    pub status: ReviewAssignmentStatus,
    pub assigned_at: String,
    pub deadline: Option<String>,
    pub is_blind_review: bool,
    pub submitter: SubmitterView,
    pub file_name: Option<String>,
}

/// 教师视角的互评任务
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct ReviewAssignmentResponse {
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: ReviewAssignmentStatus,
    pub assigned_at: String,
    pub deadline: Option<String>,
    pub is_ai_review: bool,
}

impl ReviewAssignmentResponse {
    /// 使用读取时刻的有效状态，不落库
    pub fn from_assignment(assignment: &ReviewAssignment, now: DateTime<Utc>) -> Self {
        Self {
            id: assignment.id,
            submission_id: assignment.submission_id,
            reviewer_id: assignment.reviewer_id,
            status: assignment.effective_status(now),
            assigned_at: to_rfc3339(assignment.assigned_at),
            deadline: assignment.deadline.map(to_rfc3339),
            is_ai_review: assignment.is_ai_review,
        }
    }
}

/// 评审记录响应
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct ReviewResponse {
    pub id: i64,
    pub review_assignment_id: i64,
    pub score: Option<f64>,
    pub comments: Option<String>,
    pub submitted_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            review_assignment_id: review.review_assignment_id,
            score: review.score,
            comments: review.comments,
            submitted_at: to_rfc3339(review.submitted_at),
        }
    }
}

/// 提交是否达到目标评审数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub enum CoverageStatus {
    Complete,
    Incomplete,
}

/// 单份提交的互评统计
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct SubmissionReviewStats {
    pub submission_id: i64,
    pub submitter_id: i64,
    pub current_reviewers: i64,
    pub passed_reviewers: i64,
    pub total_assigned: i64,
    pub completed: i64,
    pub status: CoverageStatus,
}

/// 评审人负载
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct ReviewerLoad {
    pub reviewer_id: i64,
    pub pool: ReviewerPool,
    pub assigned: i64,
    pub completed: i64,
}

/// 作业互评统计
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub struct PeerReviewStats {
    pub assignment_id: i64,
    pub reviews_per_submission: i32,
    pub total_submissions: i64,
    pub total_assignments: i64,
    pub average_assignments_per_submission: f64,
    pub submissions_meeting_target: i64,
    pub completed_reviews: i64,
    pub overdue_reviews: i64,
    pub current_student_count: i64,
    pub passed_student_count: i64,
    pub under_served_submission_ids: Vec<i64>,
    pub submissions: Vec<SubmissionReviewStats>,
    pub reviewer_loads: Vec<ReviewerLoad>,
}
