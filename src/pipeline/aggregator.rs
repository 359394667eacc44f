//! 整卷批改编排
//!
//! 把识别与批改串成一次完整的批改：取得批改权（比较交换进入
//! PROCESSING）→ 读取评分标准与页面文件 → 转写 → 逐题给分 →
//! 整体替换逐题结果并落总分。首次批改与重批共用同一入口。
//!
//! 整个流程有总时长上限；任何一步失败或超时都把提交置为 FAILED
//! 并记录原因，不会留在 PROCESSING。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::extract::{ExtractionService, RawPage};
use super::grade::Grader;
use crate::errors::{MarkSystemError, Result};
use crate::files::FileStore;
use crate::models::submissions::{entities::Submission, requests::NewQuestionResult};
use crate::storage::Storage;

#[derive(Clone)]
pub struct GradingPipeline {
    storage: Arc<dyn Storage>,
    file_store: Arc<dyn FileStore>,
    extraction: ExtractionService,
    grader: Arc<dyn Grader>,
    timeout: Duration,
}

impl GradingPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        file_store: Arc<dyn FileStore>,
        extraction: ExtractionService,
        grader: Arc<dyn Grader>,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            file_store,
            extraction,
            grader,
            timeout,
        }
    }

    /// 批改一份提交，返回落库后的最终提交
    ///
    /// 未获得批改权（已在 PROCESSING）时返回 PipelineBusy；其余失败
    /// 会落为 FAILED 状态并正常返回，由调用方从状态与 error_reason
    /// 中读取结果。
    ///
    /// 取得批改权后实际批改在独立任务中执行：调用方的 future 被中断
    /// （如客户端断开连接）不会取消批改，状态总会落到 GRADED 或
    /// FAILED，不会滞留在 PROCESSING。
    pub async fn grade_submission(&self, submission_id: i64) -> Result<Submission> {
        if !self.storage.try_begin_grading(submission_id).await? {
            return Err(MarkSystemError::pipeline_busy(format!(
                "提交 {submission_id} 正在批改中"
            )));
        }

        let task = tokio::spawn({
            let pipeline = self.clone();
            async move { pipeline.run_to_completion(submission_id).await }
        });
        task.await
            .map_err(|e| MarkSystemError::grading_call(format!("批改任务异常终止: {e}")))??;

        self.storage
            .get_submission_by_id(submission_id)
            .await?
            .ok_or_else(|| MarkSystemError::not_found(format!("提交不存在: {submission_id}")))
    }

    /// 带时限执行批改并把状态落到 GRADED 或 FAILED
    async fn run_to_completion(&self, submission_id: i64) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.run(submission_id)).await {
            Ok(Ok(total_marks)) => {
                self.storage.mark_graded(submission_id, total_marks).await?;
                info!("提交 {} 批改完成，总分 {}", submission_id, total_marks);
            }
            Ok(Err(e)) => {
                error!("提交 {} 批改失败: {}", submission_id, e);
                self.storage
                    .mark_failed(submission_id, &e.format_simple())
                    .await?;
            }
            Err(_) => {
                let e = MarkSystemError::pipeline_timeout(format!(
                    "批改超时（超过 {} 秒）",
                    self.timeout.as_secs()
                ));
                error!("提交 {} {}", submission_id, e.message());
                self.storage
                    .mark_failed(submission_id, &e.format_simple())
                    .await?;
            }
        }

        Ok(())
    }

    /// 批改主体，成功返回总分（逐题得分之和）
    async fn run(&self, submission_id: i64) -> Result<f64> {
        let submission = self
            .storage
            .get_submission_by_id(submission_id)
            .await?
            .ok_or_else(|| MarkSystemError::not_found(format!("提交不存在: {submission_id}")))?;

        let scheme = self
            .storage
            .get_assessment_with_mark_scheme(submission.assessment_id)
            .await?
            .ok_or_else(|| {
                MarkSystemError::not_found(format!("测评不存在: {}", submission.assessment_id))
            })?;
        if scheme.questions.is_empty() {
            return Err(MarkSystemError::validation("测评没有题目，无法批改"));
        }

        let files = self.storage.get_submission_files(submission_id).await?;
        if files.is_empty() {
            return Err(MarkSystemError::validation("提交没有任何页面文件"));
        }

        let mut pages = Vec::with_capacity(files.len());
        for file in &files {
            pages.push(RawPage {
                data: self.file_store.load(&file.locator).await?,
                content_type: file.content_type.clone(),
            });
        }

        // 单个 PDF 整本转写，图像序列走分批路径
        let transcript = if pages.len() == 1 && pages[0].content_type == "application/pdf" {
            self.extraction.transcribe_pdf(&pages[0].data).await?
        } else {
            self.extraction.transcribe_pages(pages).await?
        };

        let awards = self
            .grader
            .grade(
                &transcript.text,
                &scheme.questions,
                scheme.assessment.strictness,
            )
            .await?;
        if awards.len() != scheme.questions.len() {
            return Err(MarkSystemError::grading_call(format!(
                "逐题结果数量（{}）与题目数量（{}）不一致",
                awards.len(),
                scheme.questions.len()
            )));
        }

        let total_marks: f64 = awards.iter().map(|a| a.awarded_marks).sum();

        let results: Vec<NewQuestionResult> = awards
            .into_iter()
            .map(|a| NewQuestionResult {
                question_id: a.question_id,
                awarded_marks: a.awarded_marks,
                transcript_slice: a.transcript_slice,
                confidence: a.confidence,
                feedback: a.feedback,
            })
            .collect();

        self.storage
            .save_question_results(submission_id, results)
            .await?;

        Ok(total_marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::{
        Assessment, AssessmentStatus, AssessmentWithScheme, Idea, Question, Strictness,
    };
    use crate::models::assessments::requests::{AssessmentListQuery, CreateAssessmentRequest};
    use crate::models::assessments::responses::AssessmentListResponse;
    use crate::models::submissions::entities::{
        QuestionResult, SubmissionFile, SubmissionStatus,
    };
    use crate::models::submissions::requests::{NewSubmissionFile, SubmissionListQuery};
    use crate::models::submissions::responses::SubmissionListResponse;
    use crate::pipeline::extract::StubExtractor;
    use crate::pipeline::grade::QuestionAward;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 内存状态机存储，仅实现流水线用到的方法
    struct MemoryStorage {
        status: Mutex<SubmissionStatus>,
        total_marks: Mutex<Option<f64>>,
        error_reason: Mutex<Option<String>>,
        saved_results: Mutex<Vec<NewQuestionResult>>,
        scheme: AssessmentWithScheme,
        files: Vec<SubmissionFile>,
    }

    impl MemoryStorage {
        fn new(status: SubmissionStatus, questions: Vec<Question>) -> Self {
            let assessment = Assessment {
                id: 1,
                class_id: 1,
                title: "物理测评".to_string(),
                description: None,
                strictness: Strictness::Standard,
                status: AssessmentStatus::Active,
                total_marks: questions.iter().map(|q| q.max_marks).sum(),
                created_by: 1,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            Self {
                status: Mutex::new(status),
                total_marks: Mutex::new(None),
                error_reason: Mutex::new(None),
                saved_results: Mutex::new(Vec::new()),
                scheme: AssessmentWithScheme {
                    assessment,
                    questions,
                },
                files: vec![SubmissionFile {
                    id: 1,
                    submission_id: 1,
                    locator: "page1".to_string(),
                    original_name: "page1.jpg".to_string(),
                    content_type: "application/octet-stream".to_string(),
                    file_size: 4,
                    created_at: chrono::Utc::now(),
                }],
            }
        }

        fn submission(&self) -> Submission {
            Submission {
                id: 1,
                assessment_id: 1,
                student_id: 2,
                status: *self.status.lock().unwrap(),
                total_marks: *self.total_marks.lock().unwrap(),
                max_marks: self.scheme.assessment.total_marks,
                original_total: None,
                adjusted_by: None,
                adjusted_reason: None,
                adjusted_at: None,
                error_reason: self.error_reason.lock().unwrap().clone(),
                created_at: chrono::Utc::now(),
                graded_at: None,
            }
        }
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn create_assessment(
            &self,
            _created_by: i64,
            _request: CreateAssessmentRequest,
        ) -> crate::errors::Result<Assessment> {
            unimplemented!()
        }

        async fn get_assessment_by_id(
            &self,
            _id: i64,
        ) -> crate::errors::Result<Option<Assessment>> {
            unimplemented!()
        }

        async fn get_assessment_with_mark_scheme(
            &self,
            _id: i64,
        ) -> crate::errors::Result<Option<AssessmentWithScheme>> {
            Ok(Some(self.scheme.clone()))
        }

        async fn list_assessments_with_pagination(
            &self,
            _query: AssessmentListQuery,
        ) -> crate::errors::Result<AssessmentListResponse> {
            unimplemented!()
        }

        async fn delete_assessment(&self, _id: i64) -> crate::errors::Result<bool> {
            unimplemented!()
        }

        async fn count_submissions_by_assessment(
            &self,
            _assessment_id: i64,
        ) -> crate::errors::Result<i64> {
            unimplemented!()
        }

        async fn create_submission(
            &self,
            _assessment_id: i64,
            _student_id: i64,
            _max_marks: f64,
        ) -> crate::errors::Result<Submission> {
            unimplemented!()
        }

        async fn get_submission_by_id(
            &self,
            _id: i64,
        ) -> crate::errors::Result<Option<Submission>> {
            Ok(Some(self.submission()))
        }

        async fn get_submission_by_assessment_and_student(
            &self,
            _assessment_id: i64,
            _student_id: i64,
        ) -> crate::errors::Result<Option<Submission>> {
            unimplemented!()
        }

        async fn list_submissions_with_pagination(
            &self,
            _assessment_id: i64,
            _query: SubmissionListQuery,
        ) -> crate::errors::Result<SubmissionListResponse> {
            unimplemented!()
        }

        async fn attach_files(
            &self,
            _submission_id: i64,
            _files: Vec<NewSubmissionFile>,
        ) -> crate::errors::Result<Vec<SubmissionFile>> {
            unimplemented!()
        }

        async fn get_submission_files(
            &self,
            _submission_id: i64,
        ) -> crate::errors::Result<Vec<SubmissionFile>> {
            Ok(self.files.clone())
        }

        async fn try_begin_grading(&self, _submission_id: i64) -> crate::errors::Result<bool> {
            let mut status = self.status.lock().unwrap();
            if *status == SubmissionStatus::Processing {
                return Ok(false);
            }
            *status = SubmissionStatus::Processing;
            Ok(true)
        }

        async fn mark_graded(
            &self,
            _submission_id: i64,
            total_marks: f64,
        ) -> crate::errors::Result<()> {
            *self.status.lock().unwrap() = SubmissionStatus::Graded;
            *self.total_marks.lock().unwrap() = Some(total_marks);
            *self.error_reason.lock().unwrap() = None;
            Ok(())
        }

        async fn mark_failed(
            &self,
            _submission_id: i64,
            reason: &str,
        ) -> crate::errors::Result<()> {
            *self.status.lock().unwrap() = SubmissionStatus::Failed;
            *self.total_marks.lock().unwrap() = None;
            *self.error_reason.lock().unwrap() = Some(reason.to_string());
            Ok(())
        }

        async fn save_question_results(
            &self,
            _submission_id: i64,
            results: Vec<NewQuestionResult>,
        ) -> crate::errors::Result<()> {
            *self.saved_results.lock().unwrap() = results;
            Ok(())
        }

        async fn get_question_results(
            &self,
            _submission_id: i64,
        ) -> crate::errors::Result<Vec<QuestionResult>> {
            unimplemented!()
        }

        async fn adjust_submission_score(
            &self,
            _submission_id: i64,
            _new_score: f64,
            _adjusted_by: i64,
            _reason: &str,
        ) -> crate::errors::Result<Option<Submission>> {
            unimplemented!()
        }
    }

    struct MemoryFileStore;

    #[async_trait]
    impl FileStore for MemoryFileStore {
        async fn store(
            &self,
            _data: &[u8],
            _original_name: &str,
            _content_type: &str,
        ) -> crate::errors::Result<String> {
            unimplemented!()
        }

        async fn load(&self, _locator: &str) -> crate::errors::Result<Vec<u8>> {
            Ok(vec![1, 2, 3, 4])
        }

        async fn delete(&self, _locator: &str) -> crate::errors::Result<()> {
            Ok(())
        }
    }

    /// 按题号返回预设分数的批改器
    struct ScriptedGrader {
        marks: HashMap<i32, f64>,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl Grader for ScriptedGrader {
        async fn grade(
            &self,
            _transcript: &str,
            questions: &[Question],
            _strictness: Strictness,
        ) -> crate::errors::Result<Vec<QuestionAward>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(MarkSystemError::grading_call("后端不可用"));
            }
            Ok(questions
                .iter()
                .map(|q| QuestionAward {
                    question_id: q.id,
                    seq_number: q.seq_number,
                    awarded_marks: self.marks.get(&q.seq_number).copied().unwrap_or(0.0),
                    transcript_slice: None,
                    confidence: 90,
                    feedback: "ok".to_string(),
                })
                .collect())
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question {
                id: 11,
                assessment_id: 1,
                seq_number: 1,
                prompt: "q1".to_string(),
                max_marks: 10.0,
                ideas: vec![Idea {
                    id: 1,
                    seq_number: 1,
                    description: "动量守恒".to_string(),
                    marks: 10.0,
                }],
            },
            Question {
                id: 12,
                assessment_id: 1,
                seq_number: 2,
                prompt: "q2".to_string(),
                max_marks: 5.0,
                ideas: vec![Idea {
                    id: 2,
                    seq_number: 1,
                    description: "电场叠加".to_string(),
                    marks: 5.0,
                }],
            },
        ]
    }

    fn pipeline(
        storage: Arc<MemoryStorage>,
        grader: ScriptedGrader,
        timeout: Duration,
    ) -> GradingPipeline {
        GradingPipeline::new(
            storage,
            Arc::new(MemoryFileStore),
            ExtractionService::new(Arc::new(StubExtractor), 3),
            Arc::new(grader),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_total_is_sum_of_awarded_marks() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Pending, questions()));
        let grader = ScriptedGrader {
            marks: HashMap::from([(1, 5.0), (2, 0.0)]),
            delay: None,
            fail: false,
        };

        let submission = pipeline(storage.clone(), grader, Duration::from_secs(5))
            .grade_submission(1)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Graded);
        assert_eq!(submission.total_marks, Some(5.0));
        let saved = storage.saved_results.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].awarded_marks, 5.0);
        assert_eq!(saved[1].awarded_marks, 0.0);
    }

    #[tokio::test]
    async fn test_processing_submission_is_busy() {
        let storage = Arc::new(MemoryStorage::new(
            SubmissionStatus::Processing,
            questions(),
        ));
        let grader = ScriptedGrader {
            marks: HashMap::new(),
            delay: None,
            fail: false,
        };

        let err = pipeline(storage, grader, Duration::from_secs(5))
            .grade_submission(1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E015");
    }

    #[tokio::test]
    async fn test_grading_failure_marks_failed_with_reason() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Pending, questions()));
        let grader = ScriptedGrader {
            marks: HashMap::new(),
            delay: None,
            fail: true,
        };

        let submission = pipeline(storage.clone(), grader, Duration::from_secs(5))
            .grade_submission(1)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Failed);
        assert!(submission.total_marks.is_none());
        assert!(
            submission
                .error_reason
                .as_deref()
                .unwrap()
                .contains("后端不可用")
        );
        assert!(storage.saved_results.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_marks_failed() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Pending, questions()));
        let grader = ScriptedGrader {
            marks: HashMap::new(),
            delay: Some(Duration::from_millis(500)),
            fail: false,
        };

        let submission = pipeline(storage.clone(), grader, Duration::from_millis(20))
            .grade_submission(1)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Failed);
        assert!(
            submission
                .error_reason
                .as_deref()
                .unwrap()
                .contains("超时")
        );
    }

    #[tokio::test]
    async fn test_empty_scheme_fails() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Pending, Vec::new()));
        let grader = ScriptedGrader {
            marks: HashMap::new(),
            delay: None,
            fail: false,
        };

        let submission = pipeline(storage, grader, Duration::from_secs(5))
            .grade_submission(1)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Failed);
        assert!(
            submission
                .error_reason
                .as_deref()
                .unwrap()
                .contains("没有题目")
        );
    }

    #[tokio::test]
    async fn test_failed_submission_can_be_regraded() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Failed, questions()));
        let grader = ScriptedGrader {
            marks: HashMap::from([(1, 10.0), (2, 5.0)]),
            delay: None,
            fail: false,
        };

        let submission = pipeline(storage, grader, Duration::from_secs(5))
            .grade_submission(1)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Graded);
        assert_eq!(submission.total_marks, Some(15.0));
        assert!(submission.error_reason.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_strand_processing() {
        let storage = Arc::new(MemoryStorage::new(SubmissionStatus::Pending, questions()));
        let grader = ScriptedGrader {
            marks: HashMap::from([(1, 10.0), (2, 5.0)]),
            delay: Some(Duration::from_millis(100)),
            fail: false,
        };
        let pipeline = pipeline(storage.clone(), grader, Duration::from_secs(5));

        // 模拟客户端在批改进行中断开连接：调用方 future 被中止
        let caller = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.grade_submission(1).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        // 批改任务独立于调用方，状态最终离开 PROCESSING
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*storage.status.lock().unwrap(), SubmissionStatus::Graded);
        assert_eq!(*storage.total_marks.lock().unwrap(), Some(15.0));

        // 落定之后重批不会被 PipelineBusy 拒绝
        let submission = pipeline.grade_submission(1).await.unwrap();
        assert_eq!(submission.status, SubmissionStatus::Graded);
    }
}
