use serde::Deserialize;
use ts_rs::TS;

use crate::models::common::pagination::PaginationQuery;

/// 改分请求
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct AdjustScoreRequest {
    pub new_score: f64,
    pub reason: String,
}

/// 提交列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionListQuery {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    pub student_id: Option<i64>,
    pub status: Option<String>,
}

/// 待持久化的提交文件信息（上传落盘后、入库前）
#[derive(Debug, Clone)]
pub struct NewSubmissionFile {
    pub locator: String,
    pub original_name: String,
    pub content_type: String,
    pub file_size: i64,
}

/// 待持久化的逐题结果（批改器输出、入库前）
#[derive(Debug, Clone)]
pub struct NewQuestionResult {
    pub question_id: i64,
    pub awarded_marks: f64,
    pub transcript_slice: Option<String>,
    pub confidence: i32,
    pub feedback: String,
}
