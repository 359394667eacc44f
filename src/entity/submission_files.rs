//! 提交文件实体
//!
//! 文件归属于其提交，随提交一起删除。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submission_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub locator: String,
    pub original_name: String,
    pub content_type: String,
    pub file_size: i64,
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
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_submission_file(self) -> crate::models::submissions::entities::SubmissionFile {
        use crate::models::submissions::entities::SubmissionFile;
        use chrono::{DateTime, Utc};

        SubmissionFile {
            id: self.id,
            submission_id: self.submission_id,
            locator: self.locator,
            original_name: self.original_name,
            content_type: self.content_type,
            file_size: self.file_size,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
