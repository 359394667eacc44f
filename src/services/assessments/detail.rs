use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::error;

use super::AssessmentService;
use crate::middlewares::RequireJWT;
use crate::models::assessments::entities::AssessmentWithScheme;
use crate::models::auth::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_assessment(
    service: &AssessmentService,
    request: &HttpRequest,
    assessment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let uid = match RequireJWT::extract_user_id(request) {
        Some(id) => id,
        None => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::Unauthorized,
                "用户未登录",
            )));
        }
    };
    let is_admin = RequireJWT::extract_user_role(request) == Some(UserRole::Admin);

    match storage.get_assessment_with_mark_scheme(assessment_id).await {
        Ok(Some(scheme)) => {
            let scheme = redact_scheme(scheme, uid, is_admin);
            Ok(HttpResponse::Ok().json(ApiResponse::success(scheme, "查询成功")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::AssessmentNotFound,
            "测评不存在",
        ))),
        Err(e) => {
            error!("查询测评失败: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询测评失败",
                )),
            )
        }
    }
}

/// 评分点只对测评创建教师与管理员可见，其他用户拿到去掉评分点的题目列表
fn redact_scheme(mut scheme: AssessmentWithScheme, uid: i64, is_admin: bool) -> AssessmentWithScheme {
    if !is_admin && scheme.assessment.created_by != uid {
        for question in &mut scheme.questions {
            question.ideas.clear();
        }
    }
    scheme
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::{
        Assessment, AssessmentStatus, Idea, Question, Strictness,
    };

    fn scheme_created_by(teacher_id: i64) -> AssessmentWithScheme {
        AssessmentWithScheme {
            assessment: Assessment {
                id: 1,
                class_id: 1,
                title: "力学测评".to_string(),
                description: None,
                strictness: Strictness::Standard,
                status: AssessmentStatus::Active,
                total_marks: 10.0,
                created_by: teacher_id,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            questions: vec![Question {
                id: 11,
                assessment_id: 1,
                seq_number: 1,
                prompt: "简述动量守恒条件".to_string(),
                max_marks: 10.0,
                ideas: vec![Idea {
                    id: 1,
                    seq_number: 1,
                    description: "系统不受外力".to_string(),
                    marks: 10.0,
                }],
            }],
        }
    }

    #[test]
    fn test_owner_sees_full_scheme() {
        let scheme = redact_scheme(scheme_created_by(7), 7, false);
        assert_eq!(scheme.questions[0].ideas.len(), 1);
    }

    #[test]
    fn test_admin_sees_full_scheme() {
        let scheme = redact_scheme(scheme_created_by(7), 99, true);
        assert_eq!(scheme.questions[0].ideas.len(), 1);
    }

    #[test]
    fn test_other_users_get_ideas_stripped() {
        let scheme = redact_scheme(scheme_created_by(7), 2, false);
        assert!(scheme.questions[0].ideas.is_empty());
        // 题目本身仍然可见
        assert_eq!(scheme.questions.len(), 1);
        assert_eq!(scheme.questions[0].max_marks, 10.0);
    }
}
