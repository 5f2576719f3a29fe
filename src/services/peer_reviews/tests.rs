//! 基于内存 SQLite 的服务层测试

use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sea_orm::{ActiveModelTrait, Set};
use std::collections::HashSet;
use std::sync::Arc;

use super::PeerReviewService;
use super::assign::assign_reviews_with_rng;
use crate::config::PeerReviewConfig;
use crate::entity::{assignments, course_enrollments, course_instances, submissions, users};
use crate::errors::PeerReviewError;
use crate::models::peer_reviews::entities::{NewReviewAssignment, ReviewAssignmentStatus};
use crate::models::peer_reviews::requests::{CreateReviewAssignmentRequest, SubmitReviewRequest};
use crate::models::rosters::entities::EnrollmentStatus;
use crate::storage::Storage;
use crate::storage::sea_orm_storage::SeaOrmStorage;

const COURSE: i64 = 1;
const OTHER_COURSE: i64 = 2;

struct Fixture {
    storage: SeaOrmStorage,
    service: PeerReviewService,
}

impl Fixture {
    async fn new() -> Self {
        let storage = SeaOrmStorage::connect_in_memory().await.unwrap();
        let service = PeerReviewService::new(
            Arc::new(storage.clone()) as Arc<dyn Storage>,
            &PeerReviewConfig::default(),
        );
        let fixture = Self { storage, service };
        fixture.course(COURSE).await;
        fixture.course(OTHER_COURSE).await;
        fixture
    }

    async fn course(&self, id: i64) {
        course_instances::ActiveModel {
            id: Set(id),
            name: Set(format!("Course {id}")),
            created_at: Set(Utc::now().timestamp()),
        }
        .insert(&self.storage.db)
        .await
        .unwrap();
    }

    async fn user(&self, id: i64, name: &str) {
        let now = Utc::now().timestamp();
        users::ActiveModel {
            id: Set(id),
            username: Set(name.to_lowercase()),
            email: Set(format!("{}@example.edu", name.to_lowercase())),
            display_name: Set(Some(name.to_string())),
            student_code: Set(Some(format!("S{id:04}"))),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.storage.db)
        .await
        .unwrap();
    }

    async fn enroll(&self, user_id: i64, is_passed: bool, status: EnrollmentStatus) {
        course_enrollments::ActiveModel {
            course_instance_id: Set(COURSE),
            user_id: Set(user_id),
            is_passed: Set(is_passed),
            status: Set(status.to_string()),
            joined_at: Set(Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&self.storage.db)
        .await
        .unwrap();
    }

    /// 创建若干学生（ID 即名称序号）并加入名册
    async fn current_students(&self, ids: &[i64]) {
        for &id in ids {
            self.user(id, &format!("Student{id}")).await;
            self.enroll(id, false, EnrollmentStatus::Active).await;
        }
    }

    async fn assignment(
        &self,
        id: i64,
        course_instance_id: i64,
        target: i32,
        blind: bool,
        review_deadline: Option<i64>,
    ) {
        let now = Utc::now().timestamp();
        assignments::ActiveModel {
            id: Set(id),
            course_instance_id: Set(course_instance_id),
            title: Set(format!("Assignment {id}")),
            deadline: Set(None),
            review_deadline: Set(review_deadline),
            num_peer_reviews_required: Set(target),
            is_blind_review: Set(blind),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.storage.db)
        .await
        .unwrap();
    }

    async fn submission(&self, id: i64, assignment_id: i64, submitter_id: i64) {
        submissions::ActiveModel {
            id: Set(id),
            assignment_id: Set(assignment_id),
            submitter_id: Set(submitter_id),
            file_name: Set(Some(format!("S{submitter_id:04}_report.pdf"))),
            submitted_at: Set(Utc::now().timestamp()),
        }
        .insert(&self.storage.db)
        .await
        .unwrap();
    }

    async fn manual(&self, submission_id: i64, reviewer_id: i64) -> i64 {
        self.service
            .create_review_assignment(CreateReviewAssignmentRequest {
                submission_id,
                reviewer_id,
            })
            .await
            .unwrap()
            .id
    }
}

fn future() -> Option<i64> {
    Some((Utc::now() + Duration::days(7)).timestamp())
}

fn past() -> Option<i64> {
    Some((Utc::now() - Duration::days(1)).timestamp())
}

/// 作业 10：学生 1、2、3 提交
async fn abc_assignment(f: &Fixture, target: i32) {
    f.assignment(10, COURSE, target, false, future()).await;
    f.submission(101, 10, 1).await;
    f.submission(102, 10, 2).await;
    f.submission(103, 10, 3).await;
}

#[tokio::test]
async fn test_assign_is_idempotent() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2, 3, 4]).await;
    abc_assignment(&f, 2).await;

    let mut rng = StdRng::seed_from_u64(1);
    let first = assign_reviews_with_rng(&f.service, 10, None, &mut rng)
        .await
        .unwrap();
    assert_eq!(first.assigned_count, 6);
    assert_eq!(first.reviews_per_submission, 2);
    assert!(first.under_served_submission_ids.is_empty());

    let second = assign_reviews_with_rng(&f.service, 10, Some(2), &mut rng)
        .await
        .unwrap();
    assert_eq!(second.assigned_count, 0);

    let rows = f.service.list_by_assignment(10).await.unwrap();
    assert_eq!(rows.len(), 6);

    let submitter_of = |submission_id: i64| submission_id - 100;
    let mut pairs = HashSet::new();
    for row in &rows {
        assert_ne!(row.reviewer_id, submitter_of(row.submission_id));
        assert!(pairs.insert((row.submission_id, row.reviewer_id)));
        assert_eq!(row.status, ReviewAssignmentStatus::Assigned);
        assert!(row.deadline.is_some());
    }
}

#[tokio::test]
async fn test_concurrent_assign_does_not_duplicate() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2, 3, 4]).await;
    abc_assignment(&f, 2).await;

    let (left, right) = tokio::join!(
        f.service.assign_reviews(10, Some(2)),
        f.service.assign_reviews(10, Some(2)),
    );
    let (left, right) = (left.unwrap(), right.unwrap());
    assert_eq!(left.assigned_count + right.assigned_count, 6);
    assert!(left.under_served_submission_ids.is_empty());
    assert!(right.under_served_submission_ids.is_empty());

    let rows = f.service.list_by_assignment(10).await.unwrap();
    assert_eq!(rows.len(), 6);
    let pairs: HashSet<_> = rows
        .iter()
        .map(|r| (r.submission_id, r.reviewer_id))
        .collect();
    assert_eq!(pairs.len(), 6);
    assert!(f.service.assignment_locks.is_empty());
}

#[tokio::test]
async fn test_ai_held_pair_is_reported_under_served() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;

    // 学生 2 是唯一可用评审人，但该评审对已被 AI 评审占用
    f.storage
        .insert_review_assignment_if_absent(NewReviewAssignment {
            submission_id: 101,
            reviewer_id: 2,
            deadline: None,
            is_ai_review: true,
        })
        .await
        .unwrap()
        .unwrap();

    let result = f.service.assign_reviews(10, Some(1)).await.unwrap();
    assert_eq!(result.assigned_count, 0);
    assert_eq!(result.under_served_submission_ids, vec![101]);
    assert_eq!(result.coverage[0].total_assigned, 0);
    assert!(result.message.contains("1 份提交仍未达到目标"));

    let stats = f.service.get_statistics(10).await.unwrap();
    assert_eq!(
        stats.under_served_submission_ids,
        result.under_served_submission_ids
    );
    assert_eq!(f.service.list_by_assignment(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_assignment_locks_are_released() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2, 3]).await;
    abc_assignment(&f, 1).await;

    f.service.assign_reviews(10, None).await.unwrap();
    assert!(f.service.assignment_locks.is_empty());

    // 冲突失败的手动指派同样释放
    let taken = f.service.list_by_submission(101).await.unwrap()[0].reviewer_id;
    assert!(matches!(
        f.service
            .create_review_assignment(CreateReviewAssignmentRequest {
                submission_id: 101,
                reviewer_id: taken,
            })
            .await,
        Err(PeerReviewError::Conflict(_))
    ));
    assert!(f.service.assignment_locks.is_empty());

    let lease = f.service.lock_assignment(10).await;
    assert_eq!(f.service.assignment_locks.len(), 1);
    drop(lease);
    assert!(f.service.assignment_locks.is_empty());
}

#[tokio::test]
async fn test_small_roster_reports_shortfall() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    // 学生 3 不在名册中，但有提交
    f.user(3, "Student3").await;
    abc_assignment(&f, 2).await;

    let result = f.service.assign_reviews(10, None).await.unwrap();
    assert_eq!(result.assigned_count, 4);
    assert_eq!(result.under_served_submission_ids, vec![101, 102]);
    assert!(result.message.contains("2 份提交仍未达到目标"));

    let stats = f.service.get_statistics(10).await.unwrap();
    assert_eq!(stats.submissions_meeting_target, 1);
    assert_eq!(stats.under_served_submission_ids, vec![101, 102]);
}

#[tokio::test]
async fn test_passed_students_fill_the_gap() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.user(3, "Student3").await;
    f.user(50, "Alumni").await;
    f.enroll(50, true, EnrollmentStatus::Active).await;
    // 已退课的学生不参与
    f.user(60, "Dropped").await;
    f.enroll(60, false, EnrollmentStatus::Dropped).await;
    abc_assignment(&f, 2).await;

    let result = f.service.assign_reviews(10, None).await.unwrap();
    assert!(result.under_served_submission_ids.is_empty());

    let stats = f.service.get_statistics(10).await.unwrap();
    assert_eq!(stats.passed_student_count, 1);
    assert_eq!(stats.current_student_count, 2);
    assert!(stats.reviewer_loads.iter().all(|l| l.reviewer_id != 60));
    let alumni = stats
        .reviewer_loads
        .iter()
        .find(|l| l.reviewer_id == 50)
        .unwrap();
    assert_eq!(alumni.assigned, 2);
}

#[tokio::test]
async fn test_assign_rejects_bad_input_without_writes() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(20, COURSE, 2, false, None).await;

    assert!(matches!(
        f.service.assign_reviews(999, Some(2)).await,
        Err(PeerReviewError::NotFound(_))
    ));
    assert!(matches!(
        f.service.assign_reviews(20, Some(2)).await,
        Err(PeerReviewError::Validation(_))
    ));

    f.submission(201, 20, 1).await;
    assert!(matches!(
        f.service.assign_reviews(20, Some(0)).await,
        Err(PeerReviewError::Validation(_))
    ));
    assert!(f.service.list_by_assignment(20).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_assignment_rules() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;

    let self_review = f
        .service
        .create_review_assignment(CreateReviewAssignmentRequest {
            submission_id: 101,
            reviewer_id: 1,
        })
        .await;
    assert!(matches!(self_review, Err(PeerReviewError::Validation(_))));

    f.manual(101, 2).await;
    let duplicate = f
        .service
        .create_review_assignment(CreateReviewAssignmentRequest {
            submission_id: 101,
            reviewer_id: 2,
        })
        .await;
    assert!(matches!(duplicate, Err(PeerReviewError::Conflict(_))));

    let missing = f
        .service
        .create_review_assignment(CreateReviewAssignmentRequest {
            submission_id: 101,
            reviewer_id: 404,
        })
        .await;
    assert!(matches!(missing, Err(PeerReviewError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_reviews_too() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;
    let id = f.manual(101, 2).await;

    let review = f
        .service
        .submit_review(
            id,
            SubmitReviewRequest {
                score: Some(88.5),
                comments: Some("结构清晰".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(review.review_assignment_id, id);
    assert_eq!(
        f.service.get_review_assignment(id).await.unwrap().status,
        ReviewAssignmentStatus::Completed
    );

    f.service.delete_assignment(id).await.unwrap();

    assert!(matches!(
        f.service.get_review_assignment(id).await,
        Err(PeerReviewError::NotFound(_))
    ));
    assert!(
        f.storage
            .list_reviews_by_review_assignment(id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        f.service.delete_assignment(id).await,
        Err(PeerReviewError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_submit_review_twice_conflicts() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;
    let id = f.manual(101, 2).await;

    f.service
        .submit_review(id, SubmitReviewRequest::default())
        .await
        .unwrap();
    let again = f
        .service
        .submit_review(id, SubmitReviewRequest::default())
        .await;
    assert!(matches!(again, Err(PeerReviewError::Conflict(_))));

    let invalid = f
        .service
        .submit_review(
            id,
            SubmitReviewRequest {
                score: Some(-1.0),
                comments: None,
            },
        )
        .await;
    assert!(matches!(invalid, Err(PeerReviewError::Validation(_))));
}

#[tokio::test]
async fn test_status_transitions() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;
    let id = f.manual(101, 2).await;

    let started = f.service.start_review(id).await.unwrap();
    assert_eq!(started.status, ReviewAssignmentStatus::InProgress);

    assert!(matches!(
        f.service.start_review(id).await,
        Err(PeerReviewError::InvalidTransition(_))
    ));
    assert!(matches!(
        f.service
            .update_status(id, ReviewAssignmentStatus::Completed)
            .await,
        Err(PeerReviewError::Validation(_))
    ));
    // 截止时间未到，不能标记逾期
    assert!(matches!(
        f.service
            .update_status(id, ReviewAssignmentStatus::Overdue)
            .await,
        Err(PeerReviewError::InvalidTransition(_))
    ));
    assert!(matches!(
        f.service.start_review(404).await,
        Err(PeerReviewError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_pending_promotes_expired_to_overdue() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2, 3]).await;
    f.assignment(10, COURSE, 1, false, past()).await;
    f.assignment(11, COURSE, 1, false, future()).await;
    f.submission(101, 10, 1).await;
    f.submission(111, 11, 3).await;
    let expired = f.manual(101, 2).await;
    let open = f.manual(111, 2).await;

    let pending = f.service.get_pending_reviews(2, None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, open);

    let stored = f
        .storage
        .get_review_assignment_by_id(expired)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReviewAssignmentStatus::Overdue);

    // 重复读取不会再次写入，结果不变
    let again = f.service.get_pending_reviews(2, None).await.unwrap();
    assert_eq!(again.len(), 1);

    // 逾期后仍可补交评审
    f.service
        .submit_review(expired, SubmitReviewRequest::default())
        .await
        .unwrap();
    assert_eq!(
        f.service.get_review_assignment(expired).await.unwrap().status,
        ReviewAssignmentStatus::Completed
    );
}

#[tokio::test]
async fn test_pending_filters_by_course_and_hides_identity() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(10, COURSE, 1, true, future()).await;
    f.submission(101, 10, 1).await;
    f.manual(101, 2).await;

    assert!(
        f.service
            .get_pending_reviews(2, Some(OTHER_COURSE))
            .await
            .unwrap()
            .is_empty()
    );

    let views = f.service.get_pending_reviews(2, Some(COURSE)).await.unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert!(view.is_blind_review);
    assert_eq!(view.submitter.display_name, "匿名学生");
    assert_eq!(view.file_name.as_deref(), Some("submission-101.pdf"));

    let json = serde_json::to_string(view).unwrap();
    assert!(!json.contains("Student1"));
    assert!(!json.contains("S0001"));
}

#[tokio::test]
async fn test_statistics_for_empty_and_missing_assignment() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2]).await;
    f.assignment(30, COURSE, 2, false, None).await;

    let stats = f.service.get_statistics(30).await.unwrap();
    assert_eq!(stats.total_submissions, 0);
    assert_eq!(stats.total_assignments, 0);
    assert_eq!(stats.current_student_count, 2);

    assert!(matches!(
        f.service.get_statistics(404).await,
        Err(PeerReviewError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_new_submission_triggers_allocation() {
    let f = Fixture::new().await;
    f.current_students(&[1, 2, 3]).await;
    f.assignment(10, COURSE, 2, false, future()).await;
    f.assignment(40, COURSE, 0, false, future()).await;
    f.submission(101, 10, 1).await;
    f.submission(401, 40, 1).await;

    let result = f.service.handle_new_submission(101).await.unwrap().unwrap();
    assert_eq!(result.assigned_count, 2);

    f.submission(102, 10, 2).await;
    let result = f.service.handle_new_submission(102).await.unwrap().unwrap();
    assert_eq!(result.assigned_count, 2);
    assert_eq!(f.service.list_by_submission(102).await.unwrap().len(), 2);

    // 未启用互评的作业不分配
    assert!(f.service.handle_new_submission(401).await.unwrap().is_none());
    assert!(matches!(
        f.service.handle_new_submission(404).await,
        Err(PeerReviewError::NotFound(_))
    ));
}
