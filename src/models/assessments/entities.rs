use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

/// 测评状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub enum AssessmentStatus {
    Draft,
    Active,
    Closed,
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssessmentStatus::Draft => "draft",
            AssessmentStatus::Active => "active",
            AssessmentStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AssessmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AssessmentStatus::Draft),
            "active" => Ok(AssessmentStatus::Active),
            "closed" => Ok(AssessmentStatus::Closed),
            other => Err(format!("unknown assessment status: {other}")),
        }
    }
}

/// 批改严格程度
///
/// 控制评分点与学生作答的匹配宽严：strict 要求措辞/推导高度一致，
/// lenient 接受等价表述。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub enum Strictness {
    Strict,
    Standard,
    Lenient,
}

impl std::fmt::Display for Strictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strictness::Strict => "strict",
            Strictness::Standard => "standard",
            Strictness::Lenient => "lenient",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Strictness::Strict),
            "standard" => Ok(Strictness::Standard),
            "lenient" => Ok(Strictness::Lenient),
            other => Err(format!("unknown strictness: {other}")),
        }
    }
}

/// 测评
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct Assessment {
    // 唯一 ID
    pub id: i64,
    // 关联的班级 ID
    pub class_id: i64,
    // 测评标题
    pub title: String,
    // 测评说明
    pub description: Option<String>,
    // 批改严格程度
    pub strictness: Strictness,
    // 生命周期状态
    pub status: AssessmentStatus,
    // 总分
    pub total_marks: f64,
    // 创建教师 ID
    pub created_by: i64,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
    // 更新时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 评分点：题目评分标准中的一条可得分项
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct Idea {
    pub id: i64,
    pub seq_number: i32,
    pub description: String,
    pub marks: f64,
}

/// 题目（含评分标准）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct Question {
    pub id: i64,
    pub assessment_id: i64,
    // 题号，决定批改与展示顺序，在测评内唯一
    pub seq_number: i32,
    pub prompt: String,
    pub max_marks: f64,
    pub ideas: Vec<Idea>,
}

/// 测评及其完整评分标准
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assessment.ts")]
pub struct AssessmentWithScheme {
    pub assessment: Assessment,
    // 按题号升序
    pub questions: Vec<Question>,
}
