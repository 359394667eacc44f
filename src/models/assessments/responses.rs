use serde::Serialize;
use ts_rs::TS;

use super::entities::Assessment;
use crate::models::PaginationInfo;

/// 测评列表项
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct AssessmentListItem {
    pub id: i64,
    pub class_id: i64,
    pub title: String,
    pub strictness: String,
    pub status: String,
    pub total_marks: f64,
    pub question_count: i64,
    pub created_at: String,
}

/// 测评列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct AssessmentListResponse {
    pub items: Vec<AssessmentListItem>,
    pub pagination: PaginationInfo,
}

/// 测评创建响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct AssessmentCreatedResponse {
    pub assessment: Assessment,
    pub question_count: usize,
}
