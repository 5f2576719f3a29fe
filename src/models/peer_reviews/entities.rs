use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 互评任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/peer-review.ts")]
pub enum ReviewAssignmentStatus {
    Assigned,   // 已分配
    InProgress, // 评审中
    Completed,  // 已完成
    Overdue,    // 已逾期
}

impl ReviewAssignmentStatus {
    pub const ASSIGNED: &'static str = "assigned";
    pub const IN_PROGRESS: &'static str = "in_progress";
    pub const COMPLETED: &'static str = "completed";
    pub const OVERDUE: &'static str = "overdue";

    /// 仍待评审人处理的状态
    pub fn pending_states() -> &'static [ReviewAssignmentStatus] {
        &[Self::Assigned, Self::InProgress]
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }

    /// 状态流转表
    ///
    /// - Assigned -> InProgress / Completed / Overdue
    /// - InProgress -> Completed / Overdue
    /// - Overdue -> Completed（补交评审）
    /// - Completed 为终态
    pub fn can_transition_to(self, next: ReviewAssignmentStatus) -> bool {
        use ReviewAssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, InProgress)
                | (Assigned, Completed)
                | (Assigned, Overdue)
                | (InProgress, Completed)
                | (InProgress, Overdue)
                | (Overdue, Completed)
        )
    }

    /// 可以流转到 `next` 的所有来源状态
    pub fn sources_of(next: ReviewAssignmentStatus) -> Vec<ReviewAssignmentStatus> {
        [
            Self::Assigned,
            Self::InProgress,
            Self::Completed,
            Self::Overdue,
        ]
        .into_iter()
        .filter(|from| from.can_transition_to(next))
        .collect()
    }
}

impl std::fmt::Display for ReviewAssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewAssignmentStatus::Assigned => write!(f, "{}", Self::ASSIGNED),
            ReviewAssignmentStatus::InProgress => write!(f, "{}", Self::IN_PROGRESS),
            ReviewAssignmentStatus::Completed => write!(f, "{}", Self::COMPLETED),
            ReviewAssignmentStatus::Overdue => write!(f, "{}", Self::OVERDUE),
        }
    }
}

impl std::str::FromStr for ReviewAssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(ReviewAssignmentStatus::Assigned),
            "in_progress" => Ok(ReviewAssignmentStatus::InProgress),
            "completed" => Ok(ReviewAssignmentStatus::Completed),
            "overdue" => Ok(ReviewAssignmentStatus::Overdue),
            _ => Err(format!("Invalid review assignment status: {s}")),
        }
    }
}

/// 互评任务：某评审人需要评审某份提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: ReviewAssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_ai_review: bool,
}

impl ReviewAssignment {
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// 读取时推导的有效状态：待处理且已过截止时间的任务视为逾期
    pub fn effective_status(&self, now: DateTime<Utc>) -> ReviewAssignmentStatus {
        if self.status.is_pending() && self.is_past_deadline(now) {
            ReviewAssignmentStatus::Overdue
        } else {
            self.status
        }
    }
}

/// 待写入台账的互评任务
#[derive(Debug, Clone, PartialEq)]
pub struct NewReviewAssignment {
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub deadline: Option<DateTime<Utc>>,
    pub is_ai_review: bool,
}

/// 评审记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub review_assignment_id: i64,
    pub score: Option<f64>,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub review_assignment_id: i64,
    pub score: Option<f64>,
    pub comments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(status: ReviewAssignmentStatus, deadline: Option<DateTime<Utc>>) -> ReviewAssignment {
        ReviewAssignment {
            id: 1,
            submission_id: 10,
            reviewer_id: 20,
            status,
            assigned_at: Utc::now() - Duration::days(3),
            deadline,
            is_ai_review: false,
        }
    }

    #[test]
    fn test_transition_table() {
        use ReviewAssignmentStatus::*;
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Overdue));
        assert!(!Completed.can_transition_to(Assigned));
        assert!(!InProgress.can_transition_to(Assigned));
        assert!(!Overdue.can_transition_to(InProgress));
    }

    #[test]
    fn test_sources_of_overdue_excludes_completed() {
        use ReviewAssignmentStatus::*;
        assert_eq!(ReviewAssignmentStatus::sources_of(Overdue), vec![Assigned, InProgress]);
        assert_eq!(
            ReviewAssignmentStatus::sources_of(Completed),
            vec![Assigned, InProgress, Overdue]
        );
    }

    #[test]
    fn test_effective_status() {
        let now = Utc::now();
        let expired = assignment(ReviewAssignmentStatus::InProgress, Some(now - Duration::hours(1)));
        assert_eq!(expired.effective_status(now), ReviewAssignmentStatus::Overdue);

        let open = assignment(ReviewAssignmentStatus::Assigned, Some(now + Duration::hours(1)));
        assert_eq!(open.effective_status(now), ReviewAssignmentStatus::Assigned);

        let done = assignment(ReviewAssignmentStatus::Completed, Some(now - Duration::hours(1)));
        assert_eq!(done.effective_status(now), ReviewAssignmentStatus::Completed);

        let no_deadline = assignment(ReviewAssignmentStatus::Assigned, None);
        assert_eq!(no_deadline.effective_status(now), ReviewAssignmentStatus::Assigned);
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            ReviewAssignmentStatus::Assigned,
            ReviewAssignmentStatus::InProgress,
            ReviewAssignmentStatus::Completed,
            ReviewAssignmentStatus::Overdue,
        ] {
            assert_eq!(status.to_string().parse::<ReviewAssignmentStatus>(), Ok(status));
        }
        assert!("pending".parse::<ReviewAssignmentStatus>().is_err());
    }
}
