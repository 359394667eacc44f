use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::assessments::requests::{AssessmentListQuery, CreateAssessmentRequest};
use crate::services::AssessmentService;

// 懒加载的全局 ASSESSMENT_SERVICE 实例
static ASSESSMENT_SERVICE: Lazy<AssessmentService> = Lazy::new(AssessmentService::new_lazy);

// HTTP处理程序
pub async fn create_assessment(
    req: HttpRequest,
    data: web::Json<CreateAssessmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .create_assessment(&req, data.into_inner())
        .await
}

pub async fn list_assessments(
    req: HttpRequest,
    query: web::Query<AssessmentListQuery>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .list_assessments(&req, query.into_inner())
        .await
}

pub async fn get_assessment(
    req: HttpRequest,
    assessment_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .get_assessment(&req, assessment_id.into_inner())
        .await
}

pub async fn delete_assessment(
    req: HttpRequest,
    assessment_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .delete_assessment(&req, assessment_id.into_inner())
        .await
}

// 配置路由
pub fn configure_assessments_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assessments")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_assessments))
                    // 教师创建测评，连同题目与评分标准
                    .route(web::post().to(create_assessment)),
            )
            .service(
                web::resource("/{assessment_id}")
                    .route(web::get().to(get_assessment))
                    // 已有提交的测评不可删除
                    .route(web::delete().to(delete_assessment)),
            ),
    );
}
