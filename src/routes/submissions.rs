use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::submissions::requests::{AdjustScoreRequest, SubmissionListQuery};
use crate::services::SubmissionService;

// 懒加载的全局 SUBMISSION_SERVICE 实例
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);

// HTTP处理程序
pub async fn create_submission(
    req: HttpRequest,
    assessment_id: web::Path<i64>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .create_submission(&req, assessment_id.into_inner(), payload)
        .await
}

pub async fn list_submissions(
    req: HttpRequest,
    assessment_id: web::Path<i64>,
    query: web::Query<SubmissionListQuery>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .list_submissions(&req, assessment_id.into_inner(), query.into_inner())
        .await
}

pub async fn get_submission(
    req: HttpRequest,
    submission_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .get_submission(&req, submission_id.into_inner())
        .await
}

pub async fn regrade_submission(
    req: HttpRequest,
    submission_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .regrade_submission(&req, submission_id.into_inner())
        .await
}

pub async fn adjust_score(
    req: HttpRequest,
    submission_id: web::Path<i64>,
    data: web::Json<AdjustScoreRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .adjust_score(&req, submission_id.into_inner(), data.into_inner())
        .await
}

// 配置路由
pub fn configure_submissions_routes(cfg: &mut web::ServiceConfig) {
    // 挂在测评下的提交入口
    cfg.service(
        web::scope("/api/v1/assessments/{assessment_id}/submissions")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    // 学生上传整份提交并同步批改
                    .route(web::post().to(create_submission))
                    // 教师查看测评下全部提交
                    .route(web::get().to(list_submissions)),
            ),
    );

    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(middlewares::RequireJWT)
            .service(web::resource("/{submission_id}").route(web::get().to(get_submission)))
            .service(
                web::resource("/{submission_id}/regrade")
                    .route(web::post().to(regrade_submission)),
            )
            .service(web::resource("/{submission_id}/score").route(web::put().to(adjust_score))),
    );
}
