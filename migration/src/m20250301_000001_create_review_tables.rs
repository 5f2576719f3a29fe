use sea_orm_migration::prelude::*;

use crate::m20250123_000001_create_tables::{Submissions, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 互评任务表 ====================
        manager
            .create_table(
                Table::create()
                    .table(ReviewAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewAssignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReviewAssignments::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReviewAssignments::ReviewerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReviewAssignments::Status).string().not_null())
                    .col(
                        ColumnDef::new(ReviewAssignments::AssignedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReviewAssignments::Deadline)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReviewAssignments::IsAiReview)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ReviewAssignments::Table, ReviewAssignments::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ReviewAssignments::Table, ReviewAssignments::ReviewerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 评审记录表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reviews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reviews::ReviewAssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reviews::Score).double().null())
                    .col(ColumnDef::new(Reviews::Comments).text().null())
                    .col(ColumnDef::new(Reviews::SubmittedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Reviews::Table, Reviews::ReviewAssignmentId)
                            .to(ReviewAssignments::Table, ReviewAssignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一提交同一评审人只能有一条任务
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_review_assignments_submission_reviewer")
                    .table(ReviewAssignments::Table)
                    .col(ReviewAssignments::SubmissionId)
                    .col(ReviewAssignments::ReviewerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_review_assignments_reviewer_id")
                    .table(ReviewAssignments::Table)
                    .col(ReviewAssignments::ReviewerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reviews_review_assignment_id")
                    .table(Reviews::Table)
                    .col(Reviews::ReviewAssignmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ReviewAssignments::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ReviewAssignments {
    #[sea_orm(iden = "review_assignments")]
    Table,
    Id,
    SubmissionId,
    ReviewerId,
    Status,
    AssignedAt,
    Deadline,
    IsAiReview,
}

#[derive(DeriveIden)]
enum Reviews {
    #[sea_orm(iden = "reviews")]
    Table,
    Id,
    ReviewAssignmentId,
    Score,
    Comments,
    SubmittedAt,
}
