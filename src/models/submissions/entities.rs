use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

/// 提交状态
///
/// 单调状态机：PENDING → PROCESSING → {GRADED, FAILED}。
/// 进入 PROCESSING 后不得回退到 PENDING。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Graded,
    Failed,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Processing => "PROCESSING",
            SubmissionStatus::Graded => "GRADED",
            SubmissionStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SubmissionStatus::Pending),
            "PROCESSING" => Ok(SubmissionStatus::Processing),
            "GRADED" => Ok(SubmissionStatus::Graded),
            "FAILED" => Ok(SubmissionStatus::Failed),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

/// 提交
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct Submission {
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub status: SubmissionStatus,
    // 当前总分（批改完成后为逐题得分之和；教师改分后可偏离该和）
    pub total_marks: Option<f64>,
    // 测评满分
    pub max_marks: f64,
    // 首次改分时留存的自动批改原始总分，一经写入不再变更
    pub original_total: Option<f64>,
    // 改分教师 ID
    pub adjusted_by: Option<i64>,
    // 改分理由
    pub adjusted_reason: Option<String>,
    // 改分时间
    pub adjusted_at: Option<chrono::DateTime<chrono::Utc>>,
    // 批改失败原因（status 为 FAILED 时有值）
    pub error_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 逐题评分结果
///
/// 由批改器一次性写入；除整卷重批外不再变更。
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct QuestionResult {
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    // 0 <= awarded_marks <= 题目满分
    pub awarded_marks: f64,
    // 识别文本中归属该题的片段（识别无法分题时为空）
    pub transcript_slice: Option<String>,
    // 匹配置信度 0-100
    pub confidence: i32,
    pub feedback: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 提交文件
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionFile {
    pub id: i64,
    pub submission_id: i64,
    // 文件存储定位符（由文件存储后端返回的不透明字符串）
    pub locator: String,
    pub original_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
