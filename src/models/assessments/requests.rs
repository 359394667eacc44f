use serde::Deserialize;
use ts_rs::TS;

use super::entities::Strictness;
use crate::models::common::pagination::PaginationQuery;

/// 创建测评请求（含题目与评分标准）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct CreateAssessmentRequest {
    pub class_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_strictness")]
    pub strictness: Strictness,
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_strictness() -> Strictness {
    Strictness::Standard
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct CreateQuestionRequest {
    pub seq_number: i32,
    pub prompt: String,
    pub max_marks: f64,
    pub ideas: Vec<CreateIdeaRequest>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct CreateIdeaRequest {
    pub description: String,
    pub marks: f64,
}

/// 测评列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct AssessmentListQuery {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    pub class_id: Option<i64>,
    pub status: Option<String>,
}
