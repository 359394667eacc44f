//! 文本识别服务
//!
//! 把一次提交的多页文件变成一份整卷转写文本：
//! - 各页归一化相互独立，放入阻塞线程池并行执行
//! - 识别按固定大小分批、严格按页序顺次调用后端（批间有上下文语义，
//!   不可乱序）
//! - 各批文本按页序拼接，批间插入固定分隔符
//! - 整卷置信度取各批最小值（短板决定整卷可信度）

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::debug;

use super::normalize::{self, Normalized};
use crate::errors::{MarkSystemError, Result};

/// 批次间分隔符，插入在相邻批次的转写文本之间
pub const BATCH_SEPARATOR: &str = "\n\n----- 分批边界 -----\n\n";

/// 提交的一页原始文件
#[derive(Debug, Clone)]
pub struct RawPage {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// 整卷转写结果
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// 置信度 0-100，取各批次最小值
    pub confidence: i32,
}

/// 单批转写结果
#[derive(Debug, Clone)]
pub struct BatchTranscript {
    pub text: String,
    pub confidence: i32,
}

/// 批次在整卷中的页码范围（从 1 起，闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub start: usize,
    pub end: usize,
}

/// 文本识别后端抽象
///
/// 实现方拿到的是已归一化的页面；`span` 与 `total_pages` 用于
/// 在提示词中说明本批在整卷中的位置。
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_batch(
        &self,
        pages: &[Normalized],
        span: PageSpan,
        total_pages: usize,
    ) -> Result<BatchTranscript>;

    /// 识别单个 PDF 文档（整本一次送入，不分批）
    async fn extract_pdf(&self, data: &[u8]) -> Result<BatchTranscript>;
}

/// 识别服务：归一化 + 分批 + 合并
#[derive(Clone)]
pub struct ExtractionService {
    extractor: Arc<dyn TextExtractor>,
    batch_size: usize,
}

impl ExtractionService {
    pub fn new(extractor: Arc<dyn TextExtractor>, batch_size: usize) -> Self {
        Self {
            extractor,
            // 0 视为不限（单批）
            batch_size: if batch_size == 0 {
                usize::MAX
            } else {
                batch_size
            },
        }
    }

    /// 转写一次提交的全部页面
    pub async fn transcribe_pages(&self, pages: Vec<RawPage>) -> Result<Transcript> {
        if pages.is_empty() {
            return Err(MarkSystemError::validation("提交不包含任何页面"));
        }

        let total_pages = pages.len();

        // 各页归一化相互独立，并行执行；结果顺序与输入一致
        let tasks = pages.into_iter().map(|page| {
            tokio::task::spawn_blocking(move || normalize::normalize_page(page.data, &page.content_type))
        });
        let mut normalized = Vec::with_capacity(total_pages);
        for joined in join_all(tasks).await {
            normalized.push(
                joined.map_err(|e| MarkSystemError::image_process(format!("归一化任务失败: {e}")))?,
            );
        }

        // 分批顺次识别
        let mut parts = Vec::new();
        let mut confidence = 100i32;
        for (batch_index, chunk) in normalized.chunks(self.batch_size).enumerate() {
            let start = batch_index * self.batch_size + 1;
            let span = PageSpan {
                start,
                end: start + chunk.len() - 1,
            };
            debug!(
                "识别第 {}-{} 页（共 {} 页）",
                span.start, span.end, total_pages
            );
            let batch = self.extractor.extract_batch(chunk, span, total_pages).await?;
            confidence = confidence.min(batch.confidence);
            parts.push(batch.text);
        }

        Ok(Transcript {
            text: parts.join(BATCH_SEPARATOR),
            confidence,
        })
    }

    /// 转写单个 PDF 文档
    pub async fn transcribe_pdf(&self, data: &[u8]) -> Result<Transcript> {
        if data.is_empty() {
            return Err(MarkSystemError::validation("PDF 内容为空"));
        }
        let batch = self.extractor.extract_pdf(data).await?;
        Ok(Transcript {
            text: batch.text,
            confidence: batch.confidence,
        })
    }
}

/// 确定性识别桩
///
/// 未配置 LLM 后端时由配置选用，返回可预测的占位转写，
/// 供本地联调与集成测试使用。
pub struct StubExtractor;

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract_batch(
        &self,
        pages: &[Normalized],
        span: PageSpan,
        total_pages: usize,
    ) -> Result<BatchTranscript> {
        let bytes: usize = pages.iter().map(|p| p.data().len()).sum();
        Ok(BatchTranscript {
            text: format!(
                "[识别桩] 第 {}-{} 页 / 共 {} 页，{} 页，合计 {} 字节",
                span.start,
                span.end,
                total_pages,
                pages.len(),
                bytes
            ),
            confidence: 100,
        })
    }

    async fn extract_pdf(&self, data: &[u8]) -> Result<BatchTranscript> {
        Ok(BatchTranscript {
            text: format!("[识别桩] PDF 文档，{} 字节", data.len()),
            confidence: 100,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 记录每次调用的页码范围，按范围返回可识别的文本
    struct RecordingExtractor {
        spans: Mutex<Vec<(PageSpan, usize)>>,
        confidences: Vec<i32>,
    }

    impl RecordingExtractor {
        fn new(confidences: Vec<i32>) -> Self {
            Self {
                spans: Mutex::new(Vec::new()),
                confidences,
            }
        }
    }

    #[async_trait]
    impl TextExtractor for RecordingExtractor {
        async fn extract_batch(
            &self,
            _pages: &[Normalized],
            span: PageSpan,
            total_pages: usize,
        ) -> Result<BatchTranscript> {
            let mut spans = self.spans.lock().unwrap();
            let index = spans.len();
            spans.push((span, total_pages));
            Ok(BatchTranscript {
                text: format!("batch{}:{}-{}", index, span.start, span.end),
                confidence: self.confidences.get(index).copied().unwrap_or(100),
            })
        }

        async fn extract_pdf(&self, _data: &[u8]) -> Result<BatchTranscript> {
            Ok(BatchTranscript {
                text: "pdf".to_string(),
                confidence: 90,
            })
        }
    }

    fn text_pages(n: usize) -> Vec<RawPage> {
        // 非图像类型走放行路径，避免测试里构造真实图片
        (0..n)
            .map(|i| RawPage {
                data: vec![i as u8; 4],
                content_type: "application/octet-stream".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batches_are_sequential_with_page_spans() {
        let extractor = Arc::new(RecordingExtractor::new(vec![100, 100, 100]));
        let service = ExtractionService::new(extractor.clone(), 2);

        let transcript = service.transcribe_pages(text_pages(5)).await.unwrap();

        let spans = extractor.spans.lock().unwrap();
        assert_eq!(
            spans.as_slice(),
            &[
                (PageSpan { start: 1, end: 2 }, 5),
                (PageSpan { start: 3, end: 4 }, 5),
                (PageSpan { start: 5, end: 5 }, 5),
            ]
        );
        assert_eq!(
            transcript.text,
            format!(
                "batch0:1-2{sep}batch1:3-4{sep}batch2:5-5",
                sep = BATCH_SEPARATOR
            )
        );
    }

    #[tokio::test]
    async fn test_confidence_is_minimum_across_batches() {
        let extractor = Arc::new(RecordingExtractor::new(vec![95, 60, 80]));
        let service = ExtractionService::new(extractor, 1);
        let transcript = service.transcribe_pages(text_pages(3)).await.unwrap();
        assert_eq!(transcript.confidence, 60);
    }

    #[tokio::test]
    async fn test_single_batch_when_batch_size_covers_all() {
        let extractor = Arc::new(RecordingExtractor::new(vec![100]));
        let service = ExtractionService::new(extractor.clone(), 10);
        let transcript = service.transcribe_pages(text_pages(3)).await.unwrap();
        assert_eq!(extractor.spans.lock().unwrap().len(), 1);
        assert!(!transcript.text.contains(BATCH_SEPARATOR));
    }

    #[tokio::test]
    async fn test_zero_batch_size_means_unlimited() {
        let extractor = Arc::new(RecordingExtractor::new(vec![100]));
        let service = ExtractionService::new(extractor.clone(), 0);
        service.transcribe_pages(text_pages(4)).await.unwrap();
        assert_eq!(extractor.spans.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_pages_rejected() {
        let service = ExtractionService::new(Arc::new(StubExtractor), 2);
        let err = service.transcribe_pages(Vec::new()).await.unwrap_err();
        assert_eq!(err.error_type(), "Validation Error");
    }

    #[tokio::test]
    async fn test_stub_extractor_is_deterministic() {
        let service = ExtractionService::new(Arc::new(StubExtractor), 2);
        let a = service.transcribe_pages(text_pages(3)).await.unwrap();
        let b = service.transcribe_pages(text_pages(3)).await.unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.confidence, 100);
    }
}
