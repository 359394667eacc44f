//! 提交存储操作
//!
//! 批改状态机的状态迁移在这里落库。进入 PROCESSING 的迁移用单条带
//! 状态条件的 UPDATE 完成（比较交换），并发重批在数据库层互斥，
//! 不依赖进程内锁。

use super::SeaOrmStorage;
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{MarkSystemError, Result};
use crate::models::{
    PaginationInfo,
    submissions::{
        entities::{Submission, SubmissionStatus},
        requests::SubmissionListQuery,
        responses::{SubmissionListItem, SubmissionListResponse},
    },
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建 PENDING 状态的提交
    pub async fn create_submission_impl(
        &self,
        assessment_id: i64,
        student_id: i64,
        max_marks: f64,
    ) -> Result<Submission> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            assessment_id: Set(assessment_id),
            student_id: Set(student_id),
            status: Set(SubmissionStatus::Pending.to_string()),
            max_marks: Set(max_marks),
            created_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("创建提交失败: {e}")))?;

        Ok(result.into_submission())
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(&self, id: i64) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 获取某学生在某测评下的提交
    pub async fn get_submission_by_assessment_and_student_impl(
        &self,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find()
            .filter(Column::AssessmentId.eq(assessment_id))
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 分页列出测评下的提交
    pub async fn list_submissions_with_pagination_impl(
        &self,
        assessment_id: i64,
        query: SubmissionListQuery,
    ) -> Result<SubmissionListResponse> {
        let page = query.pagination.page.max(1) as u64;
        let size = query.pagination.size.clamp(1, 100) as u64;

        let mut select = Submissions::find().filter(Column::AssessmentId.eq(assessment_id));

        // 学生筛选
        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }

        // 状态筛选
        if let Some(ref status) = query.status
            && !status.trim().is_empty()
        {
            select = select.filter(Column::Status.eq(status.trim()));
        }

        select = select.order_by_desc(Column::CreatedAt);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交页数失败: {e}")))?;

        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交列表失败: {e}")))?;

        let items = models
            .into_iter()
            .map(|m| {
                let submission = m.into_submission();
                SubmissionListItem {
                    id: submission.id,
                    assessment_id: submission.assessment_id,
                    student_id: submission.student_id,
                    status: submission.status.to_string(),
                    total_marks: submission.total_marks,
                    max_marks: submission.max_marks,
                    adjusted: submission.adjusted_by.is_some(),
                    created_at: submission.created_at.to_rfc3339(),
                    graded_at: submission.graded_at.map(|t| t.to_rfc3339()),
                }
            })
            .collect();

        Ok(SubmissionListResponse {
            items,
            pagination: PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        })
    }

    /// 比较交换进入 PROCESSING
    ///
    /// 单条带状态条件的 UPDATE：当前状态已是 PROCESSING 时迁移失败
    /// （已有批改在进行），其余状态均可进入批改（PENDING 的首次批改
    /// 与 GRADED/FAILED 的重批共用此入口）。返回是否获得批改权。
    pub async fn try_begin_grading_impl(&self, submission_id: i64) -> Result<bool> {
        let result = Submissions::update_many()
            .col_expr(
                Column::Status,
                Expr::value(SubmissionStatus::Processing.to_string()),
            )
            .col_expr(Column::ErrorReason, Expr::value(Option::<String>::None))
            .filter(Column::Id.eq(submission_id))
            .filter(Column::Status.ne(SubmissionStatus::Processing.to_string()))
            .exec(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("更新提交状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 批改成功：写总分、置 GRADED、记录批改时间
    ///
    /// 重批产生全新的批改结果，此前的改分审计字段与留存的原始总分
    /// 一并清空。
    pub async fn mark_graded_impl(&self, submission_id: i64, total_marks: f64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            id: Set(submission_id),
            status: Set(SubmissionStatus::Graded.to_string()),
            total_marks: Set(Some(total_marks)),
            original_total: Set(None),
            adjusted_by: Set(None),
            adjusted_reason: Set(None),
            adjusted_at: Set(None),
            error_reason: Set(None),
            graded_at: Set(Some(now)),
            ..Default::default()
        };

        model
            .update(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("更新提交状态失败: {e}")))?;

        Ok(())
    }

    /// 批改失败：置 FAILED 并记录失败原因
    pub async fn mark_failed_impl(&self, submission_id: i64, reason: &str) -> Result<()> {
        let model = ActiveModel {
            id: Set(submission_id),
            status: Set(SubmissionStatus::Failed.to_string()),
            total_marks: Set(None),
            error_reason: Set(Some(reason.to_string())),
            graded_at: Set(None),
            ..Default::default()
        };

        model
            .update(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("更新提交状态失败: {e}")))?;

        Ok(())
    }

    /// 教师改分
    ///
    /// 首次改分时把当前总分留存到 original_total，此后不再覆盖，
    /// 保证自动批改的原始总分可追溯。
    pub async fn adjust_submission_score_impl(
        &self,
        submission_id: i64,
        new_score: f64,
        adjusted_by: i64,
        reason: &str,
    ) -> Result<Option<Submission>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let Some(existing) = Submissions::find_by_id(submission_id)
            .one(&txn)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询提交失败: {e}")))?
        else {
            return Ok(None);
        };

        let now = chrono::Utc::now().timestamp();

        let mut model = ActiveModel {
            id: Set(submission_id),
            total_marks: Set(Some(new_score)),
            adjusted_by: Set(Some(adjusted_by)),
            adjusted_reason: Set(Some(reason.to_string())),
            adjusted_at: Set(Some(now)),
            ..Default::default()
        };

        // 仅首次改分写入 original_total
        if existing.original_total.is_none() {
            model.original_total = Set(existing.total_marks);
        }

        model
            .update(&txn)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("改分失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("提交事务失败: {e}")))?;

        self.get_submission_by_id_impl(submission_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::requests::{
        CreateAssessmentRequest, CreateIdeaRequest, CreateQuestionRequest,
    };
    use crate::models::assessments::entities::Strictness;
    use migration::{Migrator, MigratorTrait};

    async fn memory_storage() -> SeaOrmStorage {
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = sea_orm::Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmStorage { db }
    }

    /// 建一个单题测评和它下面的一份提交，返回提交 ID
    async fn seed_submission(storage: &SeaOrmStorage) -> i64 {
        let assessment = storage
            .create_assessment_impl(
                1,
                CreateAssessmentRequest {
                    class_id: 1,
                    title: "物理测评".to_string(),
                    description: None,
                    strictness: Strictness::Standard,
                    questions: vec![CreateQuestionRequest {
                        seq_number: 1,
                        prompt: "简述动量守恒".to_string(),
                        max_marks: 10.0,
                        ideas: vec![CreateIdeaRequest {
                            description: "系统不受外力".to_string(),
                            marks: 10.0,
                        }],
                    }],
                },
            )
            .await
            .unwrap();

        storage
            .create_submission_impl(assessment.id, 2, assessment.total_marks)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_original_total_written_once() {
        let storage = memory_storage().await;
        let id = seed_submission(&storage).await;

        storage.mark_graded_impl(id, 7.5).await.unwrap();

        let first = storage
            .adjust_submission_score_impl(id, 9.0, 1, "第 2 问表述正确")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.total_marks, Some(9.0));
        assert_eq!(first.original_total, Some(7.5));

        // 再次改分不得覆盖首次留存的原始总分
        let second = storage
            .adjust_submission_score_impl(id, 6.0, 1, "复核后下调")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.total_marks, Some(6.0));
        assert_eq!(second.original_total, Some(7.5));
        assert_eq!(second.adjusted_reason.as_deref(), Some("复核后下调"));
    }

    #[tokio::test]
    async fn test_try_begin_grading_excludes_processing_only() {
        let storage = memory_storage().await;
        let id = seed_submission(&storage).await;

        assert!(storage.try_begin_grading_impl(id).await.unwrap());
        // 已在 PROCESSING，拿不到批改权
        assert!(!storage.try_begin_grading_impl(id).await.unwrap());

        storage.mark_failed_impl(id, "后端不可用").await.unwrap();
        // FAILED 可重批，且残留的失败原因被清掉
        assert!(storage.try_begin_grading_impl(id).await.unwrap());
        let submission = storage.get_submission_by_id_impl(id).await.unwrap().unwrap();
        assert_eq!(submission.status, SubmissionStatus::Processing);
        assert!(submission.error_reason.is_none());
    }

    #[tokio::test]
    async fn test_regrade_clears_adjustment_audit() {
        let storage = memory_storage().await;
        let id = seed_submission(&storage).await;

        storage.mark_graded_impl(id, 5.0).await.unwrap();
        storage
            .adjust_submission_score_impl(id, 8.0, 1, "手工复核")
            .await
            .unwrap();

        // 重批产生全新结果，旧的改分审计随之作废
        storage.mark_graded_impl(id, 6.0).await.unwrap();
        let submission = storage.get_submission_by_id_impl(id).await.unwrap().unwrap();
        assert_eq!(submission.total_marks, Some(6.0));
        assert!(submission.original_total.is_none());
        assert!(submission.adjusted_by.is_none());
        assert!(submission.adjusted_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_failed_clears_total() {
        let storage = memory_storage().await;
        let id = seed_submission(&storage).await;

        storage.mark_graded_impl(id, 9.0).await.unwrap();
        storage.mark_failed_impl(id, "批改超时").await.unwrap();

        let submission = storage.get_submission_by_id_impl(id).await.unwrap().unwrap();
        assert_eq!(submission.status, SubmissionStatus::Failed);
        assert!(submission.total_marks.is_none());
        assert!(submission.graded_at.is_none());
        assert_eq!(submission.error_reason.as_deref(), Some("批改超时"));
    }
}
