pub mod adjust;
pub mod create;
pub mod detail;
pub mod list;
pub mod regrade;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::files::FileStore;
use crate::models::submissions::requests::{AdjustScoreRequest, SubmissionListQuery};
use crate::pipeline::aggregator::GradingPipeline;
use crate::storage::Storage;

pub struct SubmissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl SubmissionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_file_store(&self, request: &HttpRequest) -> Arc<dyn FileStore> {
        request
            .app_data::<actix_web::web::Data<Arc<dyn FileStore>>>()
            .expect("FileStore not found in app data")
            .get_ref()
            .clone()
    }

    pub(crate) fn get_pipeline(&self, request: &HttpRequest) -> Arc<GradingPipeline> {
        request
            .app_data::<actix_web::web::Data<Arc<GradingPipeline>>>()
            .expect("GradingPipeline not found in app data")
            .get_ref()
            .clone()
    }

    // 上传提交并同步批改
    pub async fn create_submission(
        &self,
        request: &HttpRequest,
        assessment_id: i64,
        payload: Multipart,
    ) -> ActixResult<HttpResponse> {
        create::create_submission(self, request, assessment_id, payload).await
    }

    // 获取提交详情（含逐题结果与文件）
    pub async fn get_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        detail::get_submission(self, request, submission_id).await
    }

    // 列出测评下的提交
    pub async fn list_submissions(
        &self,
        request: &HttpRequest,
        assessment_id: i64,
        query: SubmissionListQuery,
    ) -> ActixResult<HttpResponse> {
        list::list_submissions(self, request, assessment_id, query).await
    }

    // 重批提交
    pub async fn regrade_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        regrade::regrade_submission(self, request, submission_id).await
    }

    // 教师改分
    pub async fn adjust_score(
        &self,
        request: &HttpRequest,
        submission_id: i64,
        data: AdjustScoreRequest,
    ) -> ActixResult<HttpResponse> {
        adjust::adjust_score(self, request, submission_id, data).await
    }
}
