use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::SubmissionService;
use crate::errors::MarkSystemError;
use crate::middlewares::RequireJWT;
use crate::models::auth::entities::UserRole;
use crate::models::submissions::responses::SubmissionGradedResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn regrade_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
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

    let submission = match storage.get_submission_by_id(submission_id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::SubmissionNotFound,
                "提交不存在",
            )));
        }
        Err(e) => {
            error!("查询提交失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询提交失败",
                )),
            );
        }
    };

    // 仅测评创建教师与管理员可发起重批
    let is_admin = RequireJWT::extract_user_role(request) == Some(UserRole::Admin);
    if !is_admin {
        let owns_assessment = match storage.get_assessment_by_id(submission.assessment_id).await {
            Ok(Some(assessment)) => assessment.created_by == uid,
            _ => false,
        };
        if !owns_assessment {
            return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::Forbidden,
                "无权重批该提交",
            )));
        }
    }

    info!("用户 {} 发起提交 {} 重批", uid, submission_id);

    let pipeline = service.get_pipeline(request);
    match pipeline.grade_submission(submission_id).await {
        Ok(graded) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SubmissionGradedResponse {
                submission_id: graded.id,
                status: graded.status.to_string(),
                total_marks: graded.total_marks,
                max_marks: graded.max_marks,
                error_reason: graded.error_reason,
            },
            "重批完成",
        ))),
        Err(MarkSystemError::PipelineBusy(msg)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(ErrorCode::GradingInProgress, msg),
        )),
        Err(e) => {
            error!("重批失败: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::GradingFailed,
                    format!("重批失败: {e}"),
                )),
            )
        }
    }
}
