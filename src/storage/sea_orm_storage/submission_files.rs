//! 提交文件存储操作

use super::SeaOrmStorage;
use crate::entity::prelude::SubmissionFiles;
use crate::entity::submission_files::{ActiveModel, Column};
use crate::errors::{MarkSystemError, Result};
use crate::models::submissions::{entities::SubmissionFile, requests::NewSubmissionFile};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

impl SeaOrmStorage {
    /// 关联上传文件记录，返回顺序与上传顺序一致
    pub async fn attach_files_impl(
        &self,
        submission_id: i64,
        files: Vec<NewSubmissionFile>,
    ) -> Result<Vec<SubmissionFile>> {
        let now = chrono::Utc::now().timestamp();

        let mut attached = Vec::with_capacity(files.len());
        for file in files {
            let model = ActiveModel {
                submission_id: Set(submission_id),
                locator: Set(file.locator),
                original_name: Set(file.original_name),
                content_type: Set(file.content_type),
                file_size: Set(file.file_size),
                created_at: Set(now),
                ..Default::default()
            };

            let result = model.insert(&self.db).await.map_err(|e| {
                MarkSystemError::database_operation(format!("写入文件记录失败: {e}"))
            })?;

            attached.push(result.into_submission_file());
        }

        Ok(attached)
    }

    /// 获取提交的文件记录，按入库顺序（即页序）
    pub async fn get_submission_files_impl(
        &self,
        submission_id: i64,
    ) -> Result<Vec<SubmissionFile>> {
        let models = SubmissionFiles::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询文件记录失败: {e}")))?;

        Ok(models.into_iter().map(|m| m.into_submission_file()).collect())
    }
}
