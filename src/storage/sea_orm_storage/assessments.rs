//! 测评存储操作

use super::SeaOrmStorage;
use crate::entity::assessments::{ActiveModel, Column, Entity as Assessments};
use crate::entity::prelude::{Ideas, Questions, Submissions};
use crate::entity::{ideas, questions, submissions};
use crate::errors::{MarkSystemError, Result};
use crate::models::{
    PaginationInfo,
    assessments::{
        entities::{Assessment, AssessmentStatus, AssessmentWithScheme, Idea, Question},
        requests::{AssessmentListQuery, CreateAssessmentRequest},
        responses::{AssessmentListItem, AssessmentListResponse},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建测评，连同题目与评分点单事务写入
    ///
    /// 测评总分为各题满分之和，在此处计算后固化。
    pub async fn create_assessment_impl(
        &self,
        created_by: i64,
        request: CreateAssessmentRequest,
    ) -> Result<Assessment> {
        let now = chrono::Utc::now().timestamp();
        let total_marks: f64 = request.questions.iter().map(|q| q.max_marks).sum();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let model = ActiveModel {
            class_id: Set(request.class_id),
            title: Set(request.title),
            description: Set(request.description),
            strictness: Set(request.strictness.to_string()),
            status: Set(AssessmentStatus::Active.to_string()),
            total_marks: Set(total_marks),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let assessment = model
            .insert(&txn)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("创建测评失败: {e}")))?;

        for question_req in request.questions {
            let question = questions::ActiveModel {
                assessment_id: Set(assessment.id),
                seq_number: Set(question_req.seq_number),
                prompt: Set(question_req.prompt),
                max_marks: Set(question_req.max_marks),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("创建题目失败: {e}")))?;

            for (index, idea_req) in question_req.ideas.into_iter().enumerate() {
                ideas::ActiveModel {
                    question_id: Set(question.id),
                    seq_number: Set(index as i32 + 1),
                    description: Set(idea_req.description),
                    marks: Set(idea_req.marks),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| {
                    MarkSystemError::database_operation(format!("创建评分点失败: {e}"))
                })?;
            }
        }

        txn.commit()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(assessment.into_assessment())
    }

    /// 通过 ID 获取测评
    pub async fn get_assessment_by_id_impl(&self, id: i64) -> Result<Option<Assessment>> {
        let result = Assessments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询测评失败: {e}")))?;

        Ok(result.map(|m| m.into_assessment()))
    }

    /// 获取测评及其完整评分标准，题目与评分点均按序号升序
    pub async fn get_assessment_with_mark_scheme_impl(
        &self,
        id: i64,
    ) -> Result<Option<AssessmentWithScheme>> {
        let Some(assessment) = self.get_assessment_by_id_impl(id).await? else {
            return Ok(None);
        };

        let question_models = Questions::find()
            .filter(questions::Column::AssessmentId.eq(id))
            .order_by_asc(questions::Column::SeqNumber)
            .all(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询题目失败: {e}")))?;

        let question_ids: Vec<i64> = question_models.iter().map(|q| q.id).collect();
        let idea_models = Ideas::find()
            .filter(ideas::Column::QuestionId.is_in(question_ids))
            .order_by_asc(ideas::Column::QuestionId)
            .order_by_asc(ideas::Column::SeqNumber)
            .all(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询评分点失败: {e}")))?;

        let questions = question_models
            .into_iter()
            .map(|q| Question {
                ideas: idea_models
                    .iter()
                    .filter(|i| i.question_id == q.id)
                    .map(|i| Idea {
                        id: i.id,
                        seq_number: i.seq_number,
                        description: i.description.clone(),
                        marks: i.marks,
                    })
                    .collect(),
                id: q.id,
                assessment_id: q.assessment_id,
                seq_number: q.seq_number,
                prompt: q.prompt,
                max_marks: q.max_marks,
            })
            .collect();

        Ok(Some(AssessmentWithScheme {
            assessment,
            questions,
        }))
    }

    /// 分页列出测评
    pub async fn list_assessments_with_pagination_impl(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse> {
        let page = query.pagination.page.max(1) as u64;
        let size = query.pagination.size.clamp(1, 100) as u64;

        let mut select = Assessments::find();

        // 班级筛选
        if let Some(class_id) = query.class_id {
            select = select.filter(Column::ClassId.eq(class_id));
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
            .map_err(|e| MarkSystemError::database_operation(format!("查询测评总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询测评页数失败: {e}")))?;

        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("查询测评列表失败: {e}")))?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            let question_count = Questions::find()
                .filter(questions::Column::AssessmentId.eq(model.id))
                .count(&self.db)
                .await
                .map_err(|e| {
                    MarkSystemError::database_operation(format!("统计题目数失败: {e}"))
                })?;

            let assessment = model.into_assessment();
            items.push(AssessmentListItem {
                id: assessment.id,
                class_id: assessment.class_id,
                title: assessment.title,
                strictness: assessment.strictness.to_string(),
                status: assessment.status.to_string(),
                total_marks: assessment.total_marks,
                question_count: question_count as i64,
                created_at: assessment.created_at.to_rfc3339(),
            });
        }

        Ok(AssessmentListResponse {
            items,
            pagination: PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        })
    }

    /// 删除测评（题目与评分点随外键级联删除）
    pub async fn delete_assessment_impl(&self, id: i64) -> Result<bool> {
        let result = Assessments::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("删除测评失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 统计测评下的提交数
    pub async fn count_submissions_by_assessment_impl(&self, assessment_id: i64) -> Result<i64> {
        let count = Submissions::find()
            .filter(submissions::Column::AssessmentId.eq(assessment_id))
            .count(&self.db)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("统计提交数失败: {e}")))?;

        Ok(count as i64)
    }
}
