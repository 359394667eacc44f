use serde::Serialize;
use ts_rs::TS;

use super::entities::{QuestionResult, Submission, SubmissionFile};
use crate::models::PaginationInfo;

/// 提交详情响应（含逐题结果与文件）
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionDetailResponse {
    pub submission: Submission,
    pub question_results: Vec<QuestionResult>,
    pub files: Vec<SubmissionFile>,
}

/// 上传批改完成响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionGradedResponse {
    pub submission_id: i64,
    pub status: String,
    pub total_marks: Option<f64>,
    pub max_marks: f64,
    pub error_reason: Option<String>,
}

/// 提交列表项
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionListItem {
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub status: String,
    pub total_marks: Option<f64>,
    pub max_marks: f64,
    pub adjusted: bool,
    pub created_at: String,
    pub graded_at: Option<String>,
}

/// 提交列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionListResponse {
    pub items: Vec<SubmissionListItem>,
    pub pagination: PaginationInfo,
}
