use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::AssessmentService;
use crate::middlewares::RequireJWT;
use crate::models::auth::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn delete_assessment(
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

    let assessment = match storage.get_assessment_by_id(assessment_id).await {
        Ok(Some(assessment)) => assessment,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AssessmentNotFound,
                "测评不存在",
            )));
        }
        Err(e) => {
            error!("查询测评失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询测评失败",
                )),
            );
        }
    };

    // 仅创建教师本人或管理员可删除
    let is_admin = RequireJWT::extract_user_role(request) == Some(UserRole::Admin);
    if assessment.created_by != uid && !is_admin {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            "无权删除该测评",
        )));
    }

    // 已有提交的测评不可删除，防止批改结果悬空
    match storage.count_submissions_by_assessment(assessment_id).await {
        Ok(0) => {}
        Ok(count) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::AssessmentHasSubmissions,
                format!("测评已有 {count} 份提交，不可删除"),
            )));
        }
        Err(e) => {
            error!("统计提交数失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "统计提交数失败",
                )),
            );
        }
    }

    match storage.delete_assessment(assessment_id).await {
        Ok(true) => {
            info!("测评 {} 已被用户 {} 删除", assessment_id, uid);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("测评删除成功")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::AssessmentNotFound,
            "测评不存在",
        ))),
        Err(e) => {
            error!("删除测评失败: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "删除测评失败",
                )),
            )
        }
    }
}
