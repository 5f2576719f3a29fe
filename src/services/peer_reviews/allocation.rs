//! 互评分配引擎（纯计算，不访问存储）
//!
//! 分三轮贪心选择评审人：
//! 1. 必选轮：按提交 ID 顺序，从在读学生中按负载升序选择，上限 `current_cap_multiplier × target`
//! 2. 再分配轮：仍未达标的提交按已分配数升序（最缺优先）重复第一轮规则
//! 3. 兜底轮：从已通过学生中选择，上限 `passed_cap_multiplier × target`
//!
//! 负载在每次选中后立即更新，后续提交看到的是最新负载。

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap};

use crate::config::PeerReviewConfig;
use crate::models::peer_reviews::entities::ReviewAssignment;
use crate::models::peer_reviews::responses::SubmissionCoverage;
use crate::models::rosters::entities::{EnrollmentState, Roster};
use crate::models::submissions::entities::Submission;

/// 单人评审数上限策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub current_cap_multiplier: u32,
    pub passed_cap_multiplier: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            current_cap_multiplier: 2,
            passed_cap_multiplier: 1,
        }
    }
}

impl From<&PeerReviewConfig> for AllocationPolicy {
    fn from(config: &PeerReviewConfig) -> Self {
        Self {
            current_cap_multiplier: config.current_cap_multiplier,
            passed_cap_multiplier: config.passed_cap_multiplier,
        }
    }
}

impl AllocationPolicy {
    pub fn cap_for(&self, pool: EnrollmentState, target: usize) -> usize {
        let multiplier = match pool {
            EnrollmentState::Current => self.current_cap_multiplier,
            EnrollmentState::Passed => self.passed_cap_multiplier,
        };
        multiplier as usize * target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPhase {
    Mandatory,
    Redistribution,
    Fallback,
}

/// 计划新建的 (提交, 评审人) 对
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReview {
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub pool: EnrollmentState,
    pub phase: AllocationPhase,
}

#[derive(Debug, Clone, Default)]
pub struct AllocationPlan {
    pub planned: Vec<PlannedReview>,
    // 按提交 ID 升序，包含已有任务
    pub coverage: Vec<SubmissionCoverage>,
    pub under_served_submission_ids: Vec<i64>,
}

/// 单次分配过程的内存状态：每份提交的评审人集合与评审人负载
struct AllocationState<'a> {
    roster: &'a Roster,
    reviewers: HashMap<i64, BTreeSet<i64>>,
    // 台账中已占用的 (提交, 评审人)，包含 AI 评审
    occupied: HashMap<i64, BTreeSet<i64>>,
    submitters: HashMap<i64, i64>,
    loads: HashMap<i64, usize>,
    planned: Vec<PlannedReview>,
}

impl<'a> AllocationState<'a> {
    fn new(submissions: &[Submission], roster: &'a Roster, existing: &[ReviewAssignment]) -> Self {
        let mut reviewers: HashMap<i64, BTreeSet<i64>> = submissions
            .iter()
            .map(|s| (s.id, BTreeSet::new()))
            .collect();
        let submitters = submissions
            .iter()
            .map(|s| (s.id, s.submitter_id))
            .collect();
        let mut occupied: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        let mut loads: HashMap<i64, usize> = HashMap::new();

        for row in existing {
            occupied
                .entry(row.submission_id)
                .or_default()
                .insert(row.reviewer_id);

            // AI 评审不计入同伴评审的数量与负载
            if row.is_ai_review {
                continue;
            }
            *loads.entry(row.reviewer_id).or_default() += 1;
            if let Some(set) = reviewers.get_mut(&row.submission_id) {
                set.insert(row.reviewer_id);
            }
        }

        Self {
            roster,
            reviewers,
            occupied,
            submitters,
            loads,
            planned: Vec::new(),
        }
    }

    fn assigned_count(&self, submission_id: i64) -> usize {
        self.reviewers.get(&submission_id).map_or(0, |s| s.len())
    }

    fn load_of(&self, reviewer_id: i64) -> usize {
        self.loads.get(&reviewer_id).copied().unwrap_or(0)
    }

    /// 为一份提交补足评审人，返回本次新增数
    fn fill<R: Rng + ?Sized>(
        &mut self,
        submission_id: i64,
        target: usize,
        pool: EnrollmentState,
        cap: usize,
        phase: AllocationPhase,
        rng: &mut R,
    ) -> usize {
        let needed = target.saturating_sub(self.assigned_count(submission_id));
        if needed == 0 {
            return 0;
        }

        let Some(&submitter_id) = self.submitters.get(&submission_id) else {
            return 0;
        };
        let members = match pool {
            EnrollmentState::Current => &self.roster.current,
            EnrollmentState::Passed => &self.roster.passed,
        };
        let already = self.occupied.get(&submission_id);

        let mut candidates: Vec<i64> = members
            .iter()
            .copied()
            .filter(|&id| id != submitter_id)
            .filter(|id| already.is_none_or(|set| !set.contains(id)))
            .filter(|&id| self.load_of(id) < cap)
            .collect();

        // 先打乱再稳定排序：负载相同的评审人随机排列
        candidates.shuffle(rng);
        candidates.sort_by_key(|&id| self.load_of(id));

        let chosen: Vec<i64> = candidates.into_iter().take(needed).collect();
        for &reviewer_id in &chosen {
            *self.loads.entry(reviewer_id).or_default() += 1;
            self.occupied
                .entry(submission_id)
                .or_default()
                .insert(reviewer_id);
            self.reviewers
                .entry(submission_id)
                .or_default()
                .insert(reviewer_id);
            self.planned.push(PlannedReview {
                submission_id,
                reviewer_id,
                pool,
                phase,
            });
        }
        chosen.len()
    }

    /// 仍未达标的提交，按已分配数升序，同数按 ID 升序
    fn short_submissions(&self, ordered_ids: &[i64], target: usize) -> Vec<i64> {
        let mut short: Vec<i64> = ordered_ids
            .iter()
            .copied()
            .filter(|&id| self.assigned_count(id) < target)
            .collect();
        short.sort_by_key(|&id| (self.assigned_count(id), id));
        short
    }

    fn into_plan(self, ordered_ids: &[i64], target: usize) -> AllocationPlan {
        let coverage: Vec<SubmissionCoverage> = ordered_ids
            .iter()
            .map(|&id| {
                let set = self.reviewers.get(&id);
                let count_in = |state: EnrollmentState| {
                    set.map_or(0, |s| {
                        s.iter()
                            .filter(|&&r| self.roster.state_of(r) == Some(state))
                            .count()
                    }) as i64
                };
                SubmissionCoverage {
                    submission_id: id,
                    total_assigned: set.map_or(0, |s| s.len()) as i64,
                    from_current: count_in(EnrollmentState::Current),
                    from_passed: count_in(EnrollmentState::Passed),
                }
            })
            .collect();

        let under_served_submission_ids = coverage
            .iter()
            .filter(|c| (c.total_assigned as usize) < target)
            .map(|c| c.submission_id)
            .collect();

        AllocationPlan {
            planned: self.planned,
            coverage,
            under_served_submission_ids,
        }
    }
}

/// 按台账现状计算每份提交的覆盖情况（不做任何分配）
pub fn ledger_coverage(
    submissions: &[Submission],
    roster: &Roster,
    rows: &[ReviewAssignment],
    target: usize,
) -> AllocationPlan {
    let mut ordered_ids: Vec<i64> = submissions.iter().map(|s| s.id).collect();
    ordered_ids.sort_unstable();
    ordered_ids.dedup();

    AllocationState::new(submissions, roster, rows).into_plan(&ordered_ids, target)
}

/// 计算本次需要新建的互评任务
///
/// `existing` 为该作业台账中已有的任务，它们同时计入提交的已分配数和评审人负载。
pub fn plan_allocation<R: Rng + ?Sized>(
    submissions: &[Submission],
    roster: &Roster,
    existing: &[ReviewAssignment],
    target: usize,
    policy: &AllocationPolicy,
    rng: &mut R,
) -> AllocationPlan {
    let mut ordered_ids: Vec<i64> = submissions.iter().map(|s| s.id).collect();
    ordered_ids.sort_unstable();
    ordered_ids.dedup();

    let mut state = AllocationState::new(submissions, roster, existing);
    if target == 0 {
        return state.into_plan(&ordered_ids, target);
    }

    let current_cap = policy.cap_for(EnrollmentState::Current, target);
    let passed_cap = policy.cap_for(EnrollmentState::Passed, target);

    for &id in &ordered_ids {
        state.fill(
            id,
            target,
            EnrollmentState::Current,
            current_cap,
            AllocationPhase::Mandatory,
            rng,
        );
    }

    for id in state.short_submissions(&ordered_ids, target) {
        state.fill(
            id,
            target,
            EnrollmentState::Current,
            current_cap,
            AllocationPhase::Redistribution,
            rng,
        );
    }

    for id in state.short_submissions(&ordered_ids, target) {
        state.fill(
            id,
            target,
            EnrollmentState::Passed,
            passed_cap,
            AllocationPhase::Fallback,
            rng,
        );
    }

    state.into_plan(&ordered_ids, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::ReviewAssignmentStatus;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const A: i64 = 1;
    const B: i64 = 2;
    const C: i64 = 3;
    const D: i64 = 4;

    fn submission(id: i64, submitter_id: i64) -> Submission {
        Submission {
            id,
            assignment_id: 1,
            submitter_id,
            file_name: None,
            submitted_at: Utc::now(),
        }
    }

    fn roster(current: &[i64], passed: &[i64]) -> Roster {
        Roster {
            current: current.iter().copied().collect(),
            passed: passed.iter().copied().collect(),
        }
    }

    fn abc_submissions() -> Vec<Submission> {
        vec![submission(101, A), submission(102, B), submission(103, C)]
    }

    fn as_existing(planned: &[PlannedReview]) -> Vec<ReviewAssignment> {
        planned
            .iter()
            .enumerate()
            .map(|(i, p)| ReviewAssignment {
                id: i as i64 + 1,
                submission_id: p.submission_id,
                reviewer_id: p.reviewer_id,
                status: ReviewAssignmentStatus::Assigned,
                assigned_at: Utc::now(),
                deadline: None,
                is_ai_review: false,
            })
            .collect()
    }

    fn assert_no_self_review_or_duplicates(submissions: &[Submission], plan: &AllocationPlan) {
        let submitters: HashMap<i64, i64> =
            submissions.iter().map(|s| (s.id, s.submitter_id)).collect();
        let mut seen = std::collections::HashSet::new();
        for p in &plan.planned {
            assert_ne!(submitters[&p.submission_id], p.reviewer_id);
            assert!(seen.insert((p.submission_id, p.reviewer_id)));
        }
    }

    #[test]
    fn test_four_current_students_fill_every_submission() {
        let submissions = abc_submissions();
        let mut rng = StdRng::seed_from_u64(7);
        let plan = plan_allocation(
            &submissions,
            &roster(&[A, B, C, D], &[]),
            &[],
            2,
            &AllocationPolicy::default(),
            &mut rng,
        );

        assert_eq!(plan.planned.len(), 6);
        assert!(plan.under_served_submission_ids.is_empty());
        assert!(plan.coverage.iter().all(|c| c.total_assigned == 2));
        assert!(plan.coverage.iter().all(|c| c.from_current == 2));
        assert_no_self_review_or_duplicates(&submissions, &plan);
    }

    #[test]
    fn test_three_current_students_still_meet_target() {
        let submissions = abc_submissions();
        let mut rng = StdRng::seed_from_u64(11);
        let plan = plan_allocation(
            &submissions,
            &roster(&[A, B, C], &[]),
            &[],
            2,
            &AllocationPolicy::default(),
            &mut rng,
        );

        assert_eq!(plan.planned.len(), 6);
        assert!(plan.under_served_submission_ids.is_empty());
        assert_no_self_review_or_duplicates(&submissions, &plan);

        // A 的提交只能由 B 和 C 评审
        let reviewers_of_a: BTreeSet<i64> = plan
            .planned
            .iter()
            .filter(|p| p.submission_id == 101)
            .map(|p| p.reviewer_id)
            .collect();
        assert_eq!(reviewers_of_a, BTreeSet::from([B, C]));
    }

    #[test]
    fn test_two_current_students_leave_shortfall() {
        let submissions = abc_submissions();
        let mut rng = StdRng::seed_from_u64(3);
        let plan = plan_allocation(
            &submissions,
            &roster(&[A, B], &[]),
            &[],
            2,
            &AllocationPolicy::default(),
            &mut rng,
        );

        assert_eq!(plan.planned.len(), 4);
        assert_eq!(plan.under_served_submission_ids, vec![101, 102]);

        let by_id: HashMap<i64, &SubmissionCoverage> =
            plan.coverage.iter().map(|c| (c.submission_id, c)).collect();
        assert_eq!(by_id[&101].total_assigned, 1);
        assert_eq!(by_id[&102].total_assigned, 1);
        assert_eq!(by_id[&103].total_assigned, 2);
    }

    #[test]
    fn test_reinvocation_creates_nothing_new() {
        let submissions = abc_submissions();
        let roster = roster(&[A, B, C, D], &[]);
        let policy = AllocationPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);

        let first = plan_allocation(&submissions, &roster, &[], 2, &policy, &mut rng);
        let existing = as_existing(&first.planned);
        let second = plan_allocation(&submissions, &roster, &existing, 2, &policy, &mut rng);

        assert!(second.planned.is_empty());
        assert_eq!(first.coverage, second.coverage);
    }

    #[test]
    fn test_existing_rows_are_never_reduced() {
        let submissions = abc_submissions();
        let roster = roster(&[A, B, C, D], &[]);
        let policy = AllocationPolicy::default();
        let mut rng = StdRng::seed_from_u64(5);

        let first = plan_allocation(&submissions, &roster, &[], 1, &policy, &mut rng);
        let existing = as_existing(&first.planned);
        let second = plan_allocation(&submissions, &roster, &existing, 3, &policy, &mut rng);

        for before in &first.coverage {
            let after = second
                .coverage
                .iter()
                .find(|c| c.submission_id == before.submission_id)
                .map(|c| c.total_assigned)
                .unwrap_or_default();
            assert!(after >= before.total_assigned);
        }
        // 新计划中不会重复已有的评审对
        for p in &second.planned {
            assert!(
                !existing
                    .iter()
                    .any(|e| e.submission_id == p.submission_id && e.reviewer_id == p.reviewer_id)
            );
        }
    }

    #[test]
    fn test_caps_respected_on_large_class() {
        let students: Vec<i64> = (1..=12).collect();
        let alumni: Vec<i64> = (100..=103).collect();
        // 只有部分学生提交，评审负载集中在少数人身上
        let submissions: Vec<Submission> = students
            .iter()
            .take(9)
            .map(|&s| submission(1000 + s, s))
            .collect();
        let roster = roster(&students[..5], &alumni);
        let policy = AllocationPolicy::default();
        let target = 3;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_allocation(&submissions, &roster, &[], target, &policy, &mut rng);
            assert_no_self_review_or_duplicates(&submissions, &plan);

            let mut loads: HashMap<i64, usize> = HashMap::new();
            for p in &plan.planned {
                *loads.entry(p.reviewer_id).or_default() += 1;
            }
            for (reviewer, load) in loads {
                match roster.state_of(reviewer) {
                    Some(EnrollmentState::Current) => assert!(load <= 2 * target),
                    Some(EnrollmentState::Passed) => assert!(load <= target),
                    None => panic!("reviewer {reviewer} is not on the roster"),
                }
            }
        }
    }

    #[test]
    fn test_passed_students_only_used_as_fallback() {
        let submissions = abc_submissions();
        let policy = AllocationPolicy::default();
        let mut rng = StdRng::seed_from_u64(9);

        let plenty = plan_allocation(
            &submissions,
            &roster(&[A, B, C, D], &[50, 51]),
            &[],
            2,
            &policy,
            &mut rng,
        );
        assert!(plenty
            .planned
            .iter()
            .all(|p| p.pool == EnrollmentState::Current));

        let scarce = plan_allocation(
            &submissions,
            &roster(&[A, B], &[50]),
            &[],
            2,
            &policy,
            &mut rng,
        );
        let fallback: Vec<&PlannedReview> = scarce
            .planned
            .iter()
            .filter(|p| p.phase == AllocationPhase::Fallback)
            .collect();
        // 已通过学生上限为 target = 2，只能补足 A、B 两份提交
        assert_eq!(fallback.len(), 2);
        assert!(fallback.iter().all(|p| p.reviewer_id == 50));
        assert!(scarce.under_served_submission_ids.is_empty());
        assert!(scarce.coverage.iter().all(|c| c.total_assigned == 2));
    }

    #[test]
    fn test_load_is_balanced_across_reviewers() {
        let students: Vec<i64> = (1..=6).collect();
        let submissions: Vec<Submission> =
            students.iter().map(|&s| submission(10 + s, s)).collect();
        let mut rng = StdRng::seed_from_u64(21);
        let plan = plan_allocation(
            &submissions,
            &roster(&students, &[]),
            &[],
            2,
            &AllocationPolicy::default(),
            &mut rng,
        );

        let mut loads: HashMap<i64, usize> = HashMap::new();
        for p in &plan.planned {
            *loads.entry(p.reviewer_id).or_default() += 1;
        }
        let max = loads.values().copied().max().unwrap_or_default();
        let min = loads.values().copied().min().unwrap_or_default();
        // 贪心结果不保证最优，但每人都有任务且远低于上限
        assert_eq!(plan.planned.len(), 12);
        assert!(min >= 1);
        assert!(max <= 3);
    }

    #[test]
    fn test_ai_rows_do_not_count() {
        let submissions = vec![submission(101, A)];
        let mut existing = as_existing(&[PlannedReview {
            submission_id: 101,
            reviewer_id: B,
            pool: EnrollmentState::Current,
            phase: AllocationPhase::Mandatory,
        }]);
        existing[0].is_ai_review = true;

        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_allocation(
            &submissions,
            &roster(&[A, B, C], &[]),
            &existing,
            1,
            &AllocationPolicy::default(),
            &mut rng,
        );
        assert_eq!(plan.planned.len(), 1);
        // 已被 AI 评审占用的评审对不会再被选中
        assert_eq!(plan.planned[0].reviewer_id, C);
    }

    #[test]
    fn test_pair_held_by_ai_row_stays_under_served() {
        let submissions = vec![submission(101, A)];
        let mut existing = as_existing(&[PlannedReview {
            submission_id: 101,
            reviewer_id: B,
            pool: EnrollmentState::Current,
            phase: AllocationPhase::Mandatory,
        }]);
        existing[0].is_ai_review = true;

        let mut rng = StdRng::seed_from_u64(2);
        let plan = plan_allocation(
            &submissions,
            &roster(&[A, B], &[]),
            &existing,
            1,
            &AllocationPolicy::default(),
            &mut rng,
        );
        assert!(plan.planned.is_empty());
        assert_eq!(plan.under_served_submission_ids, vec![101]);
        assert_eq!(plan.coverage[0].total_assigned, 0);
    }

    #[test]
    fn test_ledger_coverage_ignores_ai_rows() {
        let submissions = abc_submissions();
        let mut existing = as_existing(&[
            PlannedReview {
                submission_id: 101,
                reviewer_id: B,
                pool: EnrollmentState::Current,
                phase: AllocationPhase::Mandatory,
            },
            PlannedReview {
                submission_id: 102,
                reviewer_id: A,
                pool: EnrollmentState::Current,
                phase: AllocationPhase::Mandatory,
            },
        ]);
        existing[1].is_ai_review = true;

        let report = ledger_coverage(&submissions, &roster(&[A, B, C], &[]), &existing, 1);
        assert!(report.planned.is_empty());
        assert_eq!(report.under_served_submission_ids, vec![102, 103]);
    }
}
