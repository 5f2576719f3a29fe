//! 匿名评审投影：只作用于评审人视角的响应，不修改存储

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::models::assignments::entities::Assignment;
use crate::models::peer_reviews::entities::ReviewAssignment;
use crate::models::peer_reviews::responses::{ReviewAssignmentView, SubmitterView};
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::User;

/// 提交者信息；匿名评审时只保留占位名称
pub fn submitter_view(
    submission: &Submission,
    submitter: Option<&User>,
    is_blind_review: bool,
    anonymous_name: &str,
) -> SubmitterView {
    if is_blind_review {
        return SubmitterView {
            user_id: None,
            display_name: anonymous_name.to_string(),
            student_code: None,
            email: None,
            is_anonymous: true,
        };
    }

    match submitter {
        Some(user) => SubmitterView {
            user_id: Some(user.id),
            display_name: user.name().to_string(),
            student_code: user.student_code.clone(),
            email: Some(user.email.clone()),
            is_anonymous: false,
        },
        // 用户记录缺失时仍然返回 ID
        None => SubmitterView {
            user_id: Some(submission.submitter_id),
            display_name: format!("#{}", submission.submitter_id),
            student_code: None,
            email: None,
            is_anonymous: false,
        },
    }
}

/// 匿名文件名：`submission-<id>[.<ext>]`
pub fn anonymized_file_name(submission_id: i64, file_name: Option<&str>) -> String {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty());

    match ext {
        Some(ext) => format!("submission-{submission_id}.{ext}"),
        None => format!("submission-{submission_id}"),
    }
}

/// 组装评审人视角的互评任务
pub fn review_assignment_view(
    review_assignment: &ReviewAssignment,
    assignment: &Assignment,
    submission: &Submission,
    submitter: Option<&User>,
    anonymous_name: &str,
    now: DateTime<Utc>,
) -> ReviewAssignmentView {
    let blind = assignment.is_blind_review;
    let file_name = if blind {
        Some(anonymized_file_name(
            submission.id,
            submission.file_name.as_deref(),
        ))
    } else {
        submission.file_name.clone()
    };

    ReviewAssignmentView {
        id: review_assignment.id,
        submission_id: submission.id,
        assignment_id: assignment.id,
        assignment_title: assignment.title.clone(),
        status: review_assignment.effective_status(now),
        assigned_at: review_assignment.assigned_at.to_rfc3339(),
        deadline: review_assignment.deadline.map(|d| d.to_rfc3339()),
        is_blind_review: blind,
        submitter: submitter_view(submission, submitter, blind, anonymous_name),
        file_name,
    }
}
