//! 提交实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub status: String,
    pub total_marks: Option<f64>,
    pub max_marks: f64,
    pub original_total: Option<f64>,
    pub adjusted_by: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub adjusted_reason: Option<String>,
    pub adjusted_at: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_reason: Option<String>,
    pub created_at: i64,
    pub graded_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessments::Entity",
        from = "Column::AssessmentId",
        to = "super::assessments::Column::Id"
    )]
    Assessment,
    #[sea_orm(has_many = "super::question_results::Entity")]
    QuestionResults,
    #[sea_orm(has_many = "super::submission_files::Entity")]
    SubmissionFiles,
}

impl Related<super::assessments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assessment.def()
    }
}

impl Related<super::question_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestionResults.def()
    }
}

impl Related<super::submission_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_submission(self) -> crate::models::submissions::entities::Submission {
        use crate::models::submissions::entities::{Submission, SubmissionStatus};
        use chrono::{DateTime, Utc};

        Submission {
            id: self.id,
            assessment_id: self.assessment_id,
            student_id: self.student_id,
            status: self.status.parse().unwrap_or(SubmissionStatus::Failed),
            total_marks: self.total_marks,
            max_marks: self.max_marks,
            original_total: self.original_total,
            adjusted_by: self.adjusted_by,
            adjusted_reason: self.adjusted_reason,
            adjusted_at: self
                .adjusted_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            error_reason: self.error_reason,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            graded_at: self
                .graded_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }
    }
}
