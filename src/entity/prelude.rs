//! 预导入模块，方便使用

pub use super::assignments::{
    ActiveModel as AssignmentActiveModel, Entity as Assignments, Model as AssignmentModel,
};
pub use super::course_enrollments::{
    ActiveModel as CourseEnrollmentActiveModel, Entity as CourseEnrollments,
    Model as CourseEnrollmentModel,
};
pub use super::course_instances::{
    ActiveModel as CourseInstanceActiveModel, Entity as CourseInstances,
    Model as CourseInstanceModel,
};
pub use super::review_assignments::{
    ActiveModel as ReviewAssignmentActiveModel, Entity as ReviewAssignments,
    Model as ReviewAssignmentModel,
};
pub use super::reviews::{ActiveModel as ReviewActiveModel, Entity as Reviews, Model as ReviewModel};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
