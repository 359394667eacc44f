use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建测评表
        manager
            .create_table(
                Table::create()
                    .table(Assessments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assessments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assessments::ClassId).big_integer().not_null())
                    .col(ColumnDef::new(Assessments::Title).string().not_null())
                    .col(ColumnDef::new(Assessments::Description).text().null())
                    .col(ColumnDef::new(Assessments::Strictness).string().not_null())
                    .col(ColumnDef::new(Assessments::Status).string().not_null())
                    .col(ColumnDef::new(Assessments::TotalMarks).double().not_null())
                    .col(
                        ColumnDef::new(Assessments::CreatedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assessments::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assessments::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建题目表
        manager
            .create_table(
                Table::create()
                    .table(Questions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Questions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Questions::AssessmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Questions::SeqNumber).integer().not_null())
                    .col(ColumnDef::new(Questions::Prompt).text().not_null())
                    .col(ColumnDef::new(Questions::MaxMarks).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Questions::Table, Questions::AssessmentId)
                            .to(Assessments::Table, Assessments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 题号在测评内唯一
        manager
            .create_index(
                Index::create()
                    .name("idx_questions_assessment_seq")
                    .table(Questions::Table)
                    .col(Questions::AssessmentId)
                    .col(Questions::SeqNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建评分点表
        manager
            .create_table(
                Table::create()
                    .table(Ideas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ideas::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ideas::QuestionId).big_integer().not_null())
                    .col(ColumnDef::new(Ideas::SeqNumber).integer().not_null())
                    .col(ColumnDef::new(Ideas::Description).text().not_null())
                    .col(ColumnDef::new(Ideas::Marks).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ideas::Table, Ideas::QuestionId)
                            .to(Questions::Table, Questions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建提交表
        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Submissions::AssessmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Submissions::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Submissions::Status).string().not_null())
                    .col(ColumnDef::new(Submissions::TotalMarks).double().null())
                    .col(ColumnDef::new(Submissions::MaxMarks).double().not_null())
                    .col(ColumnDef::new(Submissions::OriginalTotal).double().null())
                    .col(ColumnDef::new(Submissions::AdjustedBy).big_integer().null())
                    .col(ColumnDef::new(Submissions::AdjustedReason).text().null())
                    .col(ColumnDef::new(Submissions::AdjustedAt).big_integer().null())
                    .col(ColumnDef::new(Submissions::ErrorReason).text().null())
                    .col(
                        ColumnDef::new(Submissions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Submissions::GradedAt).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Submissions::Table, Submissions::AssessmentId)
                            .to(Assessments::Table, Assessments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个学生每个测评至多一份提交
        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_assessment_student")
                    .table(Submissions::Table)
                    .col(Submissions::AssessmentId)
                    .col(Submissions::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建逐题结果表
        manager
            .create_table(
                Table::create()
                    .table(QuestionResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuestionResults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(QuestionResults::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuestionResults::QuestionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuestionResults::AwardedMarks)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuestionResults::TranscriptSlice)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QuestionResults::Confidence)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuestionResults::Feedback).text().not_null())
                    .col(
                        ColumnDef::new(QuestionResults::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(QuestionResults::Table, QuestionResults::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建提交文件表
        manager
            .create_table(
                Table::create()
                    .table(SubmissionFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubmissionFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubmissionFiles::Locator).string().not_null())
                    .col(
                        ColumnDef::new(SubmissionFiles::OriginalName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::ContentType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::FileSize)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SubmissionFiles::Table, SubmissionFiles::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubmissionFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuestionResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ideas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Questions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assessments::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Assessments {
    Table,
    Id,
    ClassId,
    Title,
    Description,
    Strictness,
    Status,
    TotalMarks,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Questions {
    Table,
    Id,
    AssessmentId,
    SeqNumber,
    Prompt,
    MaxMarks,
}

#[derive(DeriveIden)]
enum Ideas {
    Table,
    Id,
    QuestionId,
    SeqNumber,
    Description,
    Marks,
}

#[derive(DeriveIden)]
enum Submissions {
    Table,
    Id,
    AssessmentId,
    StudentId,
    Status,
    TotalMarks,
    MaxMarks,
    OriginalTotal,
    AdjustedBy,
    AdjustedReason,
    AdjustedAt,
    ErrorReason,
    CreatedAt,
    GradedAt,
}

#[derive(DeriveIden)]
enum QuestionResults {
    Table,
    Id,
    SubmissionId,
    QuestionId,
    AwardedMarks,
    TranscriptSlice,
    Confidence,
    Feedback,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SubmissionFiles {
    Table,
    Id,
    SubmissionId,
    Locator,
    OriginalName,
    ContentType,
    FileSize,
    CreatedAt,
}
