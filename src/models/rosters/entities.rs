use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// 选课记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,  // 在读
    Dropped, // 已退课
}

impl EnrollmentStatus {
    pub const ACTIVE: &'static str = "active";
    pub const DROPPED: &'static str = "dropped";
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Active => write!(f, "{}", Self::ACTIVE),
            EnrollmentStatus::Dropped => write!(f, "{}", Self::DROPPED),
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "dropped" => Ok(EnrollmentStatus::Dropped),
            _ => Err(format!("Invalid enrollment status: {s}")),
        }
    }
}

/// 评审人来源：在读学生或已通过课程的学生
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    Current,
    Passed,
}

/// 名册条目（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: i64,
    pub course_instance_id: i64,
    pub is_passed: bool,
    pub status: EnrollmentStatus,
}

impl RosterEntry {
    /// 已通过优先；未通过且在读为 Current；其余不参与互评
    pub fn enrollment_state(&self) -> Option<EnrollmentState> {
        if self.is_passed {
            Some(EnrollmentState::Passed)
        } else if self.status == EnrollmentStatus::Active {
            Some(EnrollmentState::Current)
        } else {
            None
        }
    }
}

/// 按评审人来源划分后的名册，两个集合互不相交
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub current: BTreeSet<i64>,
    pub passed: BTreeSet<i64>,
}

impl Roster {
    pub fn partition(entries: &[RosterEntry]) -> Self {
        let mut roster = Roster::default();
        for entry in entries {
            match entry.enrollment_state() {
                Some(EnrollmentState::Passed) => {
                    roster.passed.insert(entry.user_id);
                }
                Some(EnrollmentState::Current) => {
                    roster.current.insert(entry.user_id);
                }
                None => {}
            }
        }
        // 同一用户若存在多条记录，以已通过为准
        let passed = roster.passed.clone();
        roster.current.retain(|id| !passed.contains(id));
        roster
    }

    pub fn state_of(&self, user_id: i64) -> Option<EnrollmentState> {
        if self.current.contains(&user_id) {
            Some(EnrollmentState::Current)
        } else if self.passed.contains(&user_id) {
            Some(EnrollmentState::Passed)
        } else {
            None
        }
    }
}
