//! 逐题结果存储操作

use super::SeaOrmStorage;
use crate::entity::prelude::{QuestionResults, Questions};
use crate::entity::question_results::{ActiveModel, Column};
use crate::errors::{MarkSystemError, Result};
use crate::models::submissions::{entities::QuestionResult, requests::NewQuestionResult};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

impl SeaOrmStorage {
    /// 整体替换提交的逐题结果
    ///
    /// 删旧写新在同一事务内完成：重批过程中任何时刻读到的都是完整的
    /// 一套结果，不会出现新旧混合。
    pub async fn save_question_results_impl(
        &self,
        submission_id: i64,
        results: Vec<NewQuestionResult>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("开启事务失败: {e}")))?;

        QuestionResults::delete_many()
            .filter(Column::SubmissionId.eq(submission_id))
            .exec(&txn)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("清除旧结果失败: {e}")))?;

        let models: Vec<ActiveModel> = results
            .into_iter()
            .map(|r| ActiveModel {
                submission_id: Set(submission_id),
                question_id: Set(r.question_id),
                awarded_marks: Set(r.awarded_marks),
                transcript_slice: Set(r.transcript_slice),
                confidence: Set(r.confidence),
                feedback: Set(r.feedback),
                created_at: Set(now),
                ..Default::default()
            })
            .collect();

        if !models.is_empty() {
            QuestionResults::insert_many(models)
                .exec(&txn)
                .await
                .map_err(|e| {
                    MarkSystemError::database_operation(format!("写入逐题结果失败: {e}"))
                })?;
        }

        txn.commit()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(())
    }

    /// 获取提交的逐题结果，按题号升序
    pub async fn get_question_results_impl(
        &self,
        submission_id: i64,
    ) -> Result<Vec<QuestionResult>> {
        let mut rows = QuestionResults::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .find_also_related(Questions)
            .all(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询逐题结果失败: {e}")))?;

        rows.sort_by_key(|(_, q)| q.as_ref().map(|q| q.seq_number).unwrap_or(i32::MAX));

        Ok(rows
            .into_iter()
            .map(|(r, _)| r.into_question_result())
            .collect())
    }
}
