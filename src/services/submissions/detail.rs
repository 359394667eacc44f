use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::error;

use super::SubmissionService;
use crate::middlewares::RequireJWT;
use crate::models::auth::entities::UserRole;
use crate::models::submissions::responses::SubmissionDetailResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_submission(
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

    // 学生本人、测评创建教师、管理员可见
    let role = RequireJWT::extract_user_role(request);
    if submission.student_id != uid && role != Some(UserRole::Admin) {
        let owns_assessment = match storage.get_assessment_by_id(submission.assessment_id).await {
            Ok(Some(assessment)) => assessment.created_by == uid,
            Ok(None) => false,
            Err(e) => {
                error!("查询测评失败: {}", e);
                false
            }
        };
        if !owns_assessment {
            return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::Forbidden,
                "无权查看该提交",
            )));
        }
    }

    let question_results = match storage.get_question_results(submission_id).await {
        Ok(results) => results,
        Err(e) => {
            error!("查询逐题结果失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询逐题结果失败",
                )),
            );
        }
    };

    let files = match storage.get_submission_files(submission_id).await {
        Ok(files) => files,
        Err(e) => {
            error!("查询文件记录失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询文件记录失败",
                )),
            );
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        SubmissionDetailResponse {
            submission,
            question_results,
            files,
        },
        "查询成功",
    )))
}
