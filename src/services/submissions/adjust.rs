//! 教师改分
//!
//! 所有校验在任何写库之前完成：提交必须已批改（GRADED）、新分数在
//! [0, 满分] 区间内、理由非空、发起者是测评创建教师或管理员。
//! 改分后的总分允许偏离逐题得分之和，首次改分留存的原始总分供审计。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::SubmissionService;
use crate::middlewares::RequireJWT;
use crate::models::auth::entities::UserRole;
use crate::models::submissions::entities::{Submission, SubmissionStatus};
use crate::models::submissions::requests::AdjustScoreRequest;
use crate::models::{ApiResponse, ErrorCode};

pub async fn adjust_score(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
    data: AdjustScoreRequest,
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

    // 仅测评创建教师与管理员可改分
    let is_admin = RequireJWT::extract_user_role(request) == Some(UserRole::Admin);
    if !is_admin {
        let owns_assessment = match storage.get_assessment_by_id(submission.assessment_id).await {
            Ok(Some(assessment)) => assessment.created_by == uid,
            _ => false,
        };
        if !owns_assessment {
            return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::Forbidden,
                "无权修改该提交的分数",
            )));
        }
    }

    if let Err((code, message)) = validate_adjustment(&submission, &data) {
        let response = ApiResponse::<()>::error_empty(code, message);
        return Ok(match code {
            ErrorCode::SubmissionNotGraded => HttpResponse::Conflict().json(response),
            _ => HttpResponse::BadRequest().json(response),
        });
    }

    match storage
        .adjust_submission_score(submission_id, data.new_score, uid, data.reason.trim())
        .await
    {
        Ok(Some(updated)) => {
            info!(
                "提交 {} 分数由 {:?} 调整为 {}，操作者 {}",
                submission_id, submission.total_marks, data.new_score, uid
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(updated, "改分成功")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::SubmissionNotFound,
            "提交不存在",
        ))),
        Err(e) => {
            error!("改分失败: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "改分失败",
                )),
            )
        }
    }
}

/// 改分前置校验，返回业务错误码与展示给调用方的消息
fn validate_adjustment(
    submission: &Submission,
    data: &AdjustScoreRequest,
) -> Result<(), (ErrorCode, String)> {
    // 未批改完成的提交不可改分
    if submission.status != SubmissionStatus::Graded {
        return Err((
            ErrorCode::SubmissionNotGraded,
            format!(
                "提交当前状态为 {}，只有已批改的提交可以改分",
                submission.status
            ),
        ));
    }

    if data.reason.trim().is_empty() {
        return Err((
            ErrorCode::InvalidAdjustment,
            "改分必须填写理由".to_string(),
        ));
    }
    if !data.new_score.is_finite()
        || data.new_score < 0.0
        || data.new_score > submission.max_marks
    {
        return Err((
            ErrorCode::InvalidAdjustment,
            format!("分数必须在 0 到 {} 之间", submission.max_marks),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded_submission() -> Submission {
        Submission {
            id: 1,
            assessment_id: 1,
            student_id: 2,
            status: SubmissionStatus::Graded,
            total_marks: Some(12.0),
            max_marks: 20.0,
            original_total: None,
            adjusted_by: None,
            adjusted_reason: None,
            adjusted_at: None,
            error_reason: None,
            created_at: chrono::Utc::now(),
            graded_at: Some(chrono::Utc::now()),
        }
    }

    fn request(new_score: f64, reason: &str) -> AdjustScoreRequest {
        AdjustScoreRequest {
            new_score,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_valid_adjustment_passes() {
        let submission = graded_submission();
        assert!(validate_adjustment(&submission, &request(15.0, "漏判第 3 题")).is_ok());
        // 边界分数同样合法
        assert!(validate_adjustment(&submission, &request(0.0, "全卷重判")).is_ok());
        assert!(validate_adjustment(&submission, &request(20.0, "满分复核")).is_ok());
    }

    #[test]
    fn test_ungraded_submission_rejected() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Processing,
            SubmissionStatus::Failed,
        ] {
            let mut submission = graded_submission();
            submission.status = status;
            let (code, _) =
                validate_adjustment(&submission, &request(10.0, "复核")).unwrap_err();
            assert_eq!(code, ErrorCode::SubmissionNotGraded);
        }
    }

    #[test]
    fn test_blank_reason_rejected() {
        let submission = graded_submission();
        for reason in ["", "   ", "\t\n"] {
            let (code, message) =
                validate_adjustment(&submission, &request(10.0, reason)).unwrap_err();
            assert_eq!(code, ErrorCode::InvalidAdjustment);
            assert!(message.contains("理由"));
        }
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let submission = graded_submission();
        for score in [-0.5, 20.5, f64::NAN, f64::INFINITY] {
            let (code, _) =
                validate_adjustment(&submission, &request(score, "复核")).unwrap_err();
            assert_eq!(code, ErrorCode::InvalidAdjustment);
        }
    }
}
