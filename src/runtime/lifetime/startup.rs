use crate::config::AppConfig;
use crate::files::{FileStore, LocalFileStore};
use crate::pipeline::aggregator::GradingPipeline;
use crate::pipeline::backend::{LlmClient, LlmExtractor, LlmGrader};
use crate::pipeline::extract::{ExtractionService, StubExtractor, TextExtractor};
use crate::pipeline::grade::{Grader, KeywordGrader};
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub file_store: Arc<dyn FileStore>,
    pub pipeline: Arc<GradingPipeline>,
}

/// 按配置组装识别与批改后端
///
/// LLM 客户端在此构造一次并注入，配置缺失（地址/密钥为空）直接
/// 启动失败；未知的后端类型回退到确定性实现并告警。
fn create_grading_backends() -> (Arc<dyn TextExtractor>, Arc<dyn Grader>) {
    let config = AppConfig::get();

    // 识别与批改共用同一个 LLM 客户端，任一侧需要时构造
    let needs_llm =
        config.extraction.backend_type == "llm" || config.grading.backend_type == "llm";
    let client: Option<Arc<LlmClient>> = if needs_llm {
        Some(Arc::new(
            LlmClient::from_config(&config.extraction)
                .expect("Failed to configure LLM backend client"),
        ))
    } else {
        None
    };

    let extractor: Arc<dyn TextExtractor> = match config.extraction.backend_type.as_str() {
        "llm" => {
            warn!(
                "Using LLM extraction backend (model: {})",
                config.extraction.model
            );
            Arc::new(LlmExtractor::new(
                client.clone().expect("LLM client must exist"),
                config.extraction.model.clone(),
            ))
        }
        "stub" => {
            warn!("Using stub extraction backend (deterministic, for development)");
            Arc::new(StubExtractor)
        }
        other => {
            warn!(
                "Unknown extraction backend '{}', falling back to stub",
                other
            );
            Arc::new(StubExtractor)
        }
    };

    let grader: Arc<dyn Grader> = match config.grading.backend_type.as_str() {
        "llm" => {
            warn!("Using LLM grading backend (model: {})", config.grading.model);
            Arc::new(LlmGrader::new(
                client.expect("LLM client must exist"),
                config.grading.model.clone(),
            ))
        }
        "keyword" => {
            warn!("Using keyword grading backend (deterministic, for development)");
            Arc::new(KeywordGrader)
        }
        other => {
            warn!(
                "Unknown grading backend '{}', falling back to keyword matcher",
                other
            );
            Arc::new(KeywordGrader)
        }
    };

    (extractor, grader)
}

/// 准备服务器启动的上下文
/// 包括存储、文件存储与批改流水线
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::get();

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let file_store: Arc<dyn FileStore> = Arc::new(LocalFileStore::from_config());
    warn!("File store initialized at {}", config.upload.dir);

    let (extractor, grader) = create_grading_backends();
    let pipeline = Arc::new(GradingPipeline::new(
        storage.clone(),
        file_store.clone(),
        ExtractionService::new(extractor, config.extraction.batch_size),
        grader,
        Duration::from_secs(config.grading.pipeline_timeout),
    ));
    warn!(
        "Grading pipeline initialized (batch size: {}, timeout: {}s)",
        config.extraction.batch_size, config.grading.pipeline_timeout
    );

    StartupContext {
        storage,
        file_store,
        pipeline,
    }
}
