//! 逐题评分结果实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "question_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    pub awarded_marks: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub transcript_slice: Option<String>,
    pub confidence: i32,
    #[sea_orm(column_type = "Text")]
    pub feedback: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id"
    )]
    Submission,
    #[sea_orm(
        belongs_to = "super::questions::Entity",
        from = "Column::QuestionId",
        to = "super::questions::Column::Id"
    )]
    Question,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl Related<super::questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_question_result(self) -> crate::models::submissions::entities::QuestionResult {
        use crate::models::submissions::entities::QuestionResult;
        use chrono::{DateTime, Utc};

        QuestionResult {
            id: self.id,
            submission_id: self.submission_id,
            question_id: self.question_id,
            awarded_marks: self.awarded_marks,
            transcript_slice: self.transcript_slice,
            confidence: self.confidence,
            feedback: self.feedback,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
