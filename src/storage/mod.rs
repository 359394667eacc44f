use std::sync::Arc;

use crate::models::{
    assessments::{
        entities::{Assessment, AssessmentWithScheme},
        requests::{AssessmentListQuery, CreateAssessmentRequest},
        responses::AssessmentListResponse,
    },
    submissions::{
        entities::{QuestionResult, Submission, SubmissionFile},
        requests::{NewQuestionResult, NewSubmissionFile, SubmissionListQuery},
        responses::SubmissionListResponse,
    },
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 测评管理方法
    // 创建测评（连同题目与评分点，单事务写入）
    async fn create_assessment(
        &self,
        created_by: i64,
        request: CreateAssessmentRequest,
    ) -> Result<Assessment>;
    // 通过ID获取测评
    async fn get_assessment_by_id(&self, id: i64) -> Result<Option<Assessment>>;
    // 获取测评及其完整评分标准（题目按题号升序）
    async fn get_assessment_with_mark_scheme(&self, id: i64)
    -> Result<Option<AssessmentWithScheme>>;
    // 列出测评
    async fn list_assessments_with_pagination(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse>;
    // 删除测评（已有提交时拒绝，由调用方先检查）
    async fn delete_assessment(&self, id: i64) -> Result<bool>;
    // 统计测评下的提交数
    async fn count_submissions_by_assessment(&self, assessment_id: i64) -> Result<i64>;

    /// 提交管理方法
    // 创建 PENDING 状态的提交
    async fn create_submission(
        &self,
        assessment_id: i64,
        student_id: i64,
        max_marks: f64,
    ) -> Result<Submission>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, id: i64) -> Result<Option<Submission>>;
    // 获取某学生在某测评下的提交
    async fn get_submission_by_assessment_and_student(
        &self,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>>;
    // 列出测评下的提交
    async fn list_submissions_with_pagination(
        &self,
        assessment_id: i64,
        query: SubmissionListQuery,
    ) -> Result<SubmissionListResponse>;
    // 关联上传文件记录
    async fn attach_files(
        &self,
        submission_id: i64,
        files: Vec<NewSubmissionFile>,
    ) -> Result<Vec<SubmissionFile>>;
    // 获取提交的文件记录（按上传顺序）
    async fn get_submission_files(&self, submission_id: i64) -> Result<Vec<SubmissionFile>>;

    /// 批改状态机方法
    // 以比较交换方式进入 PROCESSING：仅当当前状态不是 PROCESSING 时
    // 成功，返回是否获得批改权（并发重批的互斥在数据库层完成）
    async fn try_begin_grading(&self, submission_id: i64) -> Result<bool>;
    // 批改成功：写入总分、置 GRADED、记录批改时间，并清空失败原因
    async fn mark_graded(&self, submission_id: i64, total_marks: f64) -> Result<()>;
    // 批改失败：置 FAILED 并记录失败原因
    async fn mark_failed(&self, submission_id: i64, reason: &str) -> Result<()>;

    /// 逐题结果方法
    // 整体替换提交的逐题结果（删旧写新，单事务）
    async fn save_question_results(
        &self,
        submission_id: i64,
        results: Vec<NewQuestionResult>,
    ) -> Result<()>;
    // 获取提交的逐题结果（按题号升序）
    async fn get_question_results(&self, submission_id: i64) -> Result<Vec<QuestionResult>>;

    /// 改分方法
    // 教师改分：更新总分并记录审计字段；首次改分时留存原始总分
    async fn adjust_submission_score(
        &self,
        submission_id: i64,
        new_score: f64,
        adjusted_by: i64,
        reason: &str,
    ) -> Result<Option<Submission>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
