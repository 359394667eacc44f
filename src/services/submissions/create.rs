//! 上传提交并同步批改
//!
//! 一次 multipart 请求携带整份提交的页面文件（字段名 file，可重复，
//! 顺序即页序）。文件校验全部通过后才落盘建档，随后在本请求内同步
//! 走完批改流水线，响应即批改结果。

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use futures_util::TryStreamExt;
use futures_util::stream::StreamExt;
use std::path::Path;
use tracing::{error, info};

use super::SubmissionService;
use crate::config::AppConfig;
use crate::errors::MarkSystemError;
use crate::middlewares::RequireJWT;
use crate::models::assessments::entities::AssessmentStatus;
use crate::models::submissions::requests::NewSubmissionFile;
use crate::models::submissions::responses::SubmissionGradedResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::{content_type_for_extension, validate_magic_bytes};

/// 读入内存的一页上传文件
struct UploadedPage {
    data: Vec<u8>,
    original_name: String,
    content_type: String,
}

pub async fn create_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    assessment_id: i64,
    payload: Multipart,
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

    let storage = service.get_storage(request);

    // 测评必须存在且未关闭
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
    if assessment.status == AssessmentStatus::Closed {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::AssessmentClosed,
            "测评已关闭，不再接收提交",
        )));
    }

    // 每名学生在一个测评下只有一份提交，重复上传走重批接口
    match storage
        .get_submission_by_assessment_and_student(assessment_id, uid)
        .await
    {
        Ok(Some(existing)) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::SubmissionAlreadyExists,
                format!("已存在提交（ID {}），如需重批请调用重批接口", existing.id),
            )));
        }
        Ok(None) => {}
        Err(e) => {
            error!("查询提交失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "查询提交失败",
                )),
            );
        }
    }

    // 读取并校验全部页面文件
    let pages = match read_pages(payload).await {
        Ok(pages) => pages,
        Err(resp) => return Ok(resp),
    };
    if pages.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::EmptyUpload,
            "提交不包含任何文件",
        )));
    }
    // PDF 只能整卷单独上传，不与图像页混排
    let pdf_count = pages
        .iter()
        .filter(|p| p.content_type == "application/pdf")
        .count();
    if pdf_count > 0 && pages.len() > 1 {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "PDF 必须作为唯一文件上传，不能与其他页面混合",
        )));
    }

    // 落盘
    let file_store = service.get_file_store(request);
    let mut new_files = Vec::with_capacity(pages.len());
    for page in &pages {
        match file_store
            .store(&page.data, &page.original_name, &page.content_type)
            .await
        {
            Ok(locator) => new_files.push(NewSubmissionFile {
                locator,
                original_name: page.original_name.clone(),
                content_type: page.content_type.clone(),
                file_size: page.data.len() as i64,
            }),
            Err(e) => {
                error!("文件存储失败: {}", e);
                return Ok(
                    HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                        ErrorCode::FileUploadFailed,
                        "文件存储失败",
                    )),
                );
            }
        }
    }

    // 建档并挂接文件
    let submission = match storage
        .create_submission(assessment_id, uid, assessment.total_marks)
        .await
    {
        Ok(submission) => submission,
        Err(e) => {
            error!("创建提交失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "创建提交失败",
                )),
            );
        }
    };
    if let Err(e) = storage.attach_files(submission.id, new_files).await {
        error!("写入文件记录失败: {}", e);
        return Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::FileUploadFailed,
                "写入文件记录失败",
            )),
        );
    }

    info!(
        "学生 {} 在测评 {} 提交 {} 页，开始批改（提交 ID {}）",
        uid,
        assessment_id,
        pages.len(),
        submission.id
    );

    // 同步批改，响应即最终状态
    let pipeline = service.get_pipeline(request);
    match pipeline.grade_submission(submission.id).await {
        Ok(graded) => Ok(HttpResponse::Created().json(ApiResponse::success(
            SubmissionGradedResponse {
                submission_id: graded.id,
                status: graded.status.to_string(),
                total_marks: graded.total_marks,
                max_marks: graded.max_marks,
                error_reason: graded.error_reason,
            },
            "提交批改完成",
        ))),
        Err(MarkSystemError::PipelineBusy(msg)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(ErrorCode::GradingInProgress, msg),
        )),
        Err(e) => {
            error!("批改流水线异常: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::GradingFailed,
                    format!("批改失败: {e}"),
                )),
            )
        }
    }
}

/// 读取 multipart 中的全部 file 字段，边读边校验
///
/// 校验失败直接返回错误响应；页面顺序与字段出现顺序一致。
async fn read_pages(mut payload: Multipart) -> Result<Vec<UploadedPage>, HttpResponse> {
    let config = AppConfig::get();
    let max_size = config.upload.max_size;
    let allowed_types = &config.upload.allowed_types;

    let mut pages = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        let content_disposition = field.content_disposition();
        let name = content_disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        if name != "file" {
            continue;
        }

        let original_name = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let extension = Path::new(&original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        if !allowed_types.iter().any(|t| t.to_lowercase() == extension) {
            return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::FileTypeNotAllowed,
                format!("不支持的文件类型: {original_name}"),
            )));
        }

        // 上传方未声明 MIME 时按扩展名推断
        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| content_type_for_extension(&extension).to_string());

        let mut data: Vec<u8> = Vec::new();
        let mut first_chunk = true;
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                HttpResponse::BadRequest().json(ApiResponse::error_empty(
                    ErrorCode::FileUploadFailed,
                    format!("读取上传内容失败: {e}"),
                ))
            })?;

            // 第一个 chunk 时验证魔术字节
            if first_chunk {
                first_chunk = false;
                if !validate_magic_bytes(&bytes, &extension) {
                    return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                        ErrorCode::FileTypeNotAllowed,
                        format!("文件内容与扩展名不匹配: {original_name}"),
                    )));
                }
            }

            data.extend_from_slice(&bytes);
            if data.len() > max_size {
                return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                    ErrorCode::FileSizeExceeded,
                    format!("文件超过大小限制: {original_name}"),
                )));
            }
        }

        if data.is_empty() {
            return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::EmptyUpload,
                format!("文件内容为空: {original_name}"),
            )));
        }

        pages.push(UploadedPage {
            data,
            original_name,
            content_type,
        });
    }

    Ok(pages)
}
