use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashSet;
use tracing::{error, info};

use super::AssessmentService;
use crate::middlewares::RequireJWT;
use crate::models::assessments::requests::CreateAssessmentRequest;
use crate::models::assessments::responses::AssessmentCreatedResponse;
use crate::models::auth::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn create_assessment(
    service: &AssessmentService,
    request: &HttpRequest,
    data: CreateAssessmentRequest,
) -> ActixResult<HttpResponse> {
    let uid = match RequireJWT::extract_user_id(request) {
        Some(id) => id,
        None => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::Unauthorized,
                "用户未登录",
            )));
        }
    };

    // 仅教师与管理员可创建测评
    match RequireJWT::extract_user_role(request) {
        Some(UserRole::Teacher) | Some(UserRole::Admin) => {}
        _ => {
            return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::Forbidden,
                "只有教师可以创建测评",
            )));
        }
    }

    if let Err(message) = validate_request(&data) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::BadRequest, message)));
    }

    let storage = service.get_storage(request);
    let question_count = data.questions.len();

    match storage.create_assessment(uid, data).await {
        Ok(assessment) => {
            info!("测评 {} 创建成功，创建者 {}", assessment.id, uid);
            Ok(HttpResponse::Created().json(ApiResponse::success(
                AssessmentCreatedResponse {
                    assessment,
                    question_count,
                },
                "测评创建成功",
            )))
        }
        Err(e) => {
            error!("测评创建失败: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("测评创建失败: {e}"),
                )),
            )
        }
    }
}

/// 请求体校验
///
/// 题号在测评内必须唯一；各题满分必须为正；评分点分值不得为负
/// （评分点分值之和允许超过题目满分，给分时截断）。
fn validate_request(data: &CreateAssessmentRequest) -> Result<(), String> {
    if data.title.trim().is_empty() {
        return Err("测评标题不能为空".to_string());
    }
    if data.questions.is_empty() {
        return Err("测评至少要有一道题目".to_string());
    }

    let mut seen = HashSet::new();
    for question in &data.questions {
        if !seen.insert(question.seq_number) {
            return Err(format!("题号 {} 重复", question.seq_number));
        }
        if question.max_marks <= 0.0 {
            return Err(format!("题目 {} 的满分必须为正数", question.seq_number));
        }
        for idea in &question.ideas {
            if idea.marks < 0.0 {
                return Err(format!("题目 {} 存在负分评分点", question.seq_number));
            }
            if idea.description.trim().is_empty() {
                return Err(format!("题目 {} 存在空的评分点描述", question.seq_number));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::Strictness;
    use crate::models::assessments::requests::{CreateIdeaRequest, CreateQuestionRequest};

    fn valid_request() -> CreateAssessmentRequest {
        CreateAssessmentRequest {
            class_id: 1,
            title: "期中测评".to_string(),
            description: None,
            strictness: Strictness::Standard,
            questions: vec![CreateQuestionRequest {
                seq_number: 1,
                prompt: "求解方程".to_string(),
                max_marks: 10.0,
                ideas: vec![CreateIdeaRequest {
                    description: "移项正确".to_string(),
                    marks: 4.0,
                }],
            }],
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(validate_request(&valid_request()).is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut req = valid_request();
        req.title = "  ".to_string();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_no_questions_rejected() {
        let mut req = valid_request();
        req.questions.clear();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_duplicate_seq_number_rejected() {
        let mut req = valid_request();
        let mut dup = req.questions[0].clone();
        dup.prompt = "另一题".to_string();
        req.questions.push(dup);
        assert!(validate_request(&req).unwrap_err().contains("重复"));
    }

    #[test]
    fn test_negative_idea_marks_rejected() {
        let mut req = valid_request();
        req.questions[0].ideas[0].marks = -1.0;
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_idea_sum_may_exceed_question_max() {
        // 评分点分值之和超过满分是合法的，给分时截断
        let mut req = valid_request();
        req.questions[0].ideas.push(CreateIdeaRequest {
            description: "结论正确".to_string(),
            marks: 8.0,
        });
        assert!(validate_request(&req).is_ok());
    }
}
