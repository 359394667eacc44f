//! LLM 识别/批改后端
//!
//! 通过 OpenAI 兼容的 `/chat/completions` 接口完成图像转写与评分标准
//! 匹配。`LlmClient` 在启动时构造一次并注入各实现，密钥与地址缺失
//! 属于配置错误，启动即失败，不留到第一次请求再暴露。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};
use tracing::debug;

use super::extract::{BatchTranscript, PageSpan, TextExtractor};
use super::grade::{Grader, NO_ANSWER_FEEDBACK, QuestionAward, award_for_matched_ideas};
use super::normalize::Normalized;
use crate::config::ExtractionConfig;
use crate::errors::{MarkSystemError, Result};
use crate::models::assessments::entities::{Question, Strictness};

/// 数学符号转写约定，嵌入识别与批改提示词
const MATH_NOTATION_GUIDE: &str = "数学内容一律用纯文本表示：分数写作 a/b，上标写作 x^2，下标写作 x_1，根号写作 sqrt(x)，希腊字母用其名称（如 alpha、pi）。不要输出 LaTeX。";

/// OpenAI 兼容后端客户端
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    /// 按配置构造，地址或密钥缺失直接报配置错误
    pub fn from_config(cfg: &ExtractionConfig) -> Result<Self> {
        if cfg.base_url.trim().is_empty() {
            return Err(MarkSystemError::extraction_config(
                "未配置识别后端地址（extraction.base_url）",
            ));
        }
        if cfg.api_key.trim().is_empty() {
            return Err(MarkSystemError::extraction_config(
                "未配置识别后端密钥（extraction.api_key）",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }

    /// 发起一次对话补全，返回首个 choice 的文本内容
    pub async fn chat(&self, model: &str, messages: Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("调用 LLM 后端: {} (model={})", url, model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": model,
                "messages": messages,
                "temperature": 0.1,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarkSystemError::extraction_call(format!(
                "后端返回 {status}: {body}"
            )));
        }

        let value: Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                MarkSystemError::extraction_call("后端响应缺少 choices[0].message.content")
            })
    }
}

/// 剥掉模型输出外层的 Markdown 代码块围栏
pub fn clean_json_response(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

fn data_url(content_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// LLM 图像转写实现
pub struct LlmExtractor {
    client: Arc<LlmClient>,
    model: String,
}

impl LlmExtractor {
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn pdf_transcription_prompt() -> String {
    format!(
        "请完整转写这份 PDF 文档的全部内容，按页面顺序输出，保留题号与分行；\
         文档中已有的批注与给分记号也要原样保留，不要遗漏或改写。{}\n\
         只输出 JSON：{{\"transcript\": \"转写文本\", \"confidence\": 0 到 100 的整数}}。",
        MATH_NOTATION_GUIDE
    )
}

fn parse_transcript_json(raw: &str) -> Result<BatchTranscript> {
    let value: Value = serde_json::from_str(clean_json_response(raw))
        .map_err(|e| MarkSystemError::extraction_call(format!("无法解析识别响应: {e}")))?;

    let text = value["transcript"]
        .as_str()
        .ok_or_else(|| MarkSystemError::extraction_call("识别响应缺少 transcript 字段"))?
        .to_string();
    let confidence = value["confidence"].as_i64().unwrap_or(100).clamp(0, 100) as i32;

    Ok(BatchTranscript { text, confidence })
}

#[async_trait]
impl TextExtractor for LlmExtractor {
    async fn extract_batch(
        &self,
        pages: &[Normalized],
        span: PageSpan,
        total_pages: usize,
    ) -> Result<BatchTranscript> {
        let mut content = vec![json!({
            "type": "text",
            "text": format!(
                "这些图片是一份学生作答的第 {} 至 {} 页（全卷共 {} 页）。\
                 请按页面顺序完整转写全部手写与印刷内容，保留题号与分行。{}\n\
                 只输出 JSON：{{\"transcript\": \"转写文本\", \"confidence\": 0 到 100 的整数}}，\
                 confidence 表示转写可信度。",
                span.start, span.end, total_pages, MATH_NOTATION_GUIDE
            ),
        })];
        for page in pages {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": data_url(page.content_type(), page.data()) },
            }));
        }

        let raw = self
            .client
            .chat(&self.model, json!([{ "role": "user", "content": content }]))
            .await?;
        parse_transcript_json(&raw)
    }

    async fn extract_pdf(&self, data: &[u8]) -> Result<BatchTranscript> {
        let content = json!([
            {
                "type": "text",
                "text": pdf_transcription_prompt(),
            },
            {
                "type": "image_url",
                "image_url": { "url": data_url("application/pdf", data) },
            },
        ]);

        let raw = self
            .client
            .chat(&self.model, json!([{ "role": "user", "content": content }]))
            .await?;
        parse_transcript_json(&raw)
    }
}

/// LLM 批改实现
pub struct LlmGrader {
    client: Arc<LlmClient>,
    model: String,
}

impl LlmGrader {
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn strictness_hint(strictness: Strictness) -> &'static str {
        match strictness {
            Strictness::Strict => "严格：作答必须与评分点的措辞或推导高度一致才算命中。",
            Strictness::Standard => "标准：作答表达了评分点的核心内容即算命中。",
            Strictness::Lenient => "宽松：作答只要体现评分点的思路或等价表述即算命中。",
        }
    }

    fn scheme_json(questions: &[Question]) -> Value {
        Value::Array(
            questions
                .iter()
                .map(|q| {
                    json!({
                        "seq_number": q.seq_number,
                        "prompt": q.prompt,
                        "max_marks": q.max_marks,
                        "ideas": q.ideas.iter().map(|idea| json!({
                            "seq_number": idea.seq_number,
                            "description": idea.description,
                            "marks": idea.marks,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect(),
        )
    }
}

/// 解析批改响应并换算逐题得分
///
/// 后端只报告命中的评分点；得分由本地按评分点分值求和并截断到
/// 题目满分，确保分数不受模型算术错误影响。
fn parse_grading_response(raw: &str, questions: &[Question]) -> Result<Vec<QuestionAward>> {
    let value: Value = serde_json::from_str(clean_json_response(raw))
        .map_err(|e| MarkSystemError::grading_call(format!("无法解析批改响应: {e}")))?;

    let entries = value["questions"]
        .as_array()
        .ok_or_else(|| MarkSystemError::grading_call("批改响应缺少 questions 数组"))?;

    let mut awards = Vec::with_capacity(questions.len());
    for question in questions {
        let entry = entries
            .iter()
            .find(|e| e["seq_number"].as_i64() == Some(question.seq_number as i64))
            .ok_or_else(|| {
                MarkSystemError::grading_call(format!(
                    "批改响应缺少题目 {} 的结果",
                    question.seq_number
                ))
            })?;

        // matched_ideas 为命中评分点的 seq_number 列表
        let matched: Vec<usize> = entry["matched_ideas"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_i64())
                    .filter_map(|seq| {
                        question
                            .ideas
                            .iter()
                            .position(|idea| idea.seq_number as i64 == seq)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let feedback = entry["feedback"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(NO_ANSWER_FEEDBACK)
            .to_string();

        awards.push(QuestionAward {
            question_id: question.id,
            seq_number: question.seq_number,
            awarded_marks: award_for_matched_ideas(question, &matched),
            transcript_slice: entry["answer_excerpt"]
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string()),
            confidence: entry["confidence"].as_i64().unwrap_or(0).clamp(0, 100) as i32,
            feedback,
        });
    }

    Ok(awards)
}

#[async_trait]
impl Grader for LlmGrader {
    async fn grade(
        &self,
        transcript: &str,
        questions: &[Question],
        strictness: Strictness,
    ) -> Result<Vec<QuestionAward>> {
        let prompt = format!(
            "你是一名阅卷教师。下面给出一份学生作答的转写文本和评分标准，\
             请逐题判定学生命中了哪些评分点。\n\
             匹配宽严（{strictness}）：{hint}\n{math}\n\
             评分标准（JSON）：\n{scheme}\n\
             学生作答转写：\n{transcript}\n\
             只输出 JSON，格式：{{\"questions\": [{{\"seq_number\": 题号, \
             \"matched_ideas\": [命中评分点的 seq_number], \"confidence\": 0 到 100 的整数, \
             \"feedback\": \"简短中文反馈\", \"answer_excerpt\": \"转写中归属该题的原文片段，找不到则为空字符串\"}}]}}。\
             每道题必须各有一个条目；找不到作答内容的题目 matched_ideas 为空数组。",
            strictness = strictness,
            hint = Self::strictness_hint(strictness),
            math = MATH_NOTATION_GUIDE,
            scheme = Self::scheme_json(questions),
            transcript = transcript,
        );

        let raw = self
            .client
            .chat(
                &self.model,
                json!([{ "role": "user", "content": prompt }]),
            )
            .await
            .map_err(|e| MarkSystemError::grading_call(e.message().to_string()))?;

        parse_grading_response(&raw, questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::Idea;

    #[test]
    fn test_clean_json_response_strips_fences() {
        assert_eq!(clean_json_response("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(clean_json_response("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(clean_json_response("```\n{\"a\":1}\n```  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_transcript_json() {
        let batch =
            parse_transcript_json("```json\n{\"transcript\": \"第1题 x=2\", \"confidence\": 87}\n```")
                .unwrap();
        assert_eq!(batch.text, "第1题 x=2");
        assert_eq!(batch.confidence, 87);

        // confidence 缺失时取 100，超界截断
        let batch = parse_transcript_json("{\"transcript\": \"t\"}").unwrap();
        assert_eq!(batch.confidence, 100);
        let batch = parse_transcript_json("{\"transcript\": \"t\", \"confidence\": 400}").unwrap();
        assert_eq!(batch.confidence, 100);

        assert!(parse_transcript_json("{\"confidence\": 50}").is_err());
        assert!(parse_transcript_json("not json at all").is_err());
    }

    fn sample_questions() -> Vec<Question> {
        vec![
            Question {
                id: 11,
                assessment_id: 1,
                seq_number: 1,
                prompt: "q1".to_string(),
                max_marks: 4.0,
                ideas: vec![
                    Idea {
                        id: 1,
                        seq_number: 1,
                        description: "a".to_string(),
                        marks: 2.0,
                    },
                    Idea {
                        id: 2,
                        seq_number: 2,
                        description: "b".to_string(),
                        marks: 3.0,
                    },
                ],
            },
            Question {
                id: 12,
                assessment_id: 1,
                seq_number: 2,
                prompt: "q2".to_string(),
                max_marks: 5.0,
                ideas: vec![Idea {
                    id: 3,
                    seq_number: 1,
                    description: "c".to_string(),
                    marks: 5.0,
                }],
            },
        ]
    }

    #[test]
    fn test_parse_grading_response_awards_and_caps() {
        let raw = r#"{"questions": [
            {"seq_number": 1, "matched_ideas": [1, 2], "confidence": 90, "feedback": "两个评分点都命中", "answer_excerpt": "x=2"},
            {"seq_number": 2, "matched_ideas": [], "confidence": 95, "feedback": "", "answer_excerpt": ""}
        ]}"#;
        let awards = parse_grading_response(raw, &sample_questions()).unwrap();

        // 2 + 3 = 5 超过满分 4，截断
        assert_eq!(awards[0].awarded_marks, 4.0);
        assert_eq!(awards[0].transcript_slice.as_deref(), Some("x=2"));
        assert_eq!(awards[1].awarded_marks, 0.0);
        assert_eq!(awards[1].feedback, NO_ANSWER_FEEDBACK);
        assert!(awards[1].transcript_slice.is_none());
    }

    #[test]
    fn test_parse_grading_response_missing_question_is_error() {
        let raw = r#"{"questions": [
            {"seq_number": 1, "matched_ideas": [1], "confidence": 80, "feedback": "ok"}
        ]}"#;
        let err = parse_grading_response(raw, &sample_questions()).unwrap_err();
        assert_eq!(err.error_type(), "Grading Backend Call Error");
    }

    #[test]
    fn test_parse_grading_response_ignores_unknown_idea_seq() {
        let raw = r#"{"questions": [
            {"seq_number": 1, "matched_ideas": [9], "confidence": 50, "feedback": "f"},
            {"seq_number": 2, "matched_ideas": [1], "confidence": 50, "feedback": "f"}
        ]}"#;
        let awards = parse_grading_response(raw, &sample_questions()).unwrap();
        assert_eq!(awards[0].awarded_marks, 0.0);
        assert_eq!(awards[1].awarded_marks, 5.0);
    }

    #[test]
    fn test_client_requires_base_url_and_key() {
        let cfg = ExtractionConfig {
            backend_type: "llm".to_string(),
            base_url: String::new(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            batch_size: 3,
            request_timeout: 30,
        };
        assert!(LlmClient::from_config(&cfg).is_err());

        let cfg = ExtractionConfig {
            base_url: "https://api.example.com/v1".to_string(),
            api_key: String::new(),
            ..cfg
        };
        assert!(LlmClient::from_config(&cfg).is_err());
    }

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(data_url("image/jpeg", b"ab"), "data:image/jpeg;base64,YWI=");
    }

    #[test]
    fn test_pdf_prompt_keeps_existing_annotations() {
        let prompt = pdf_transcription_prompt();
        assert!(prompt.contains("批注"));
        assert!(prompt.contains("给分记号"));
        assert!(prompt.contains("原样保留"));
    }
}
