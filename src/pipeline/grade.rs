//! 评分标准匹配与逐题给分
//!
//! 批改器的输入是整卷转写文本与测评的评分标准，输出与题目一一对应、
//! 按题号升序的逐题给分。单题得分恒为命中评分点分值之和，并截断到
//! 题目满分，无论后端实现如何。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::Result;
use crate::models::assessments::entities::{Question, Strictness};

/// 未找到作答内容时的固定反馈
pub const NO_ANSWER_FEEDBACK: &str = "未在识别文本中找到该题的作答内容";

/// 单题给分结果
#[derive(Debug, Clone)]
pub struct QuestionAward {
    pub question_id: i64,
    pub seq_number: i32,
    pub awarded_marks: f64,
    /// 识别文本中归属该题的片段，无法分题时为空
    pub transcript_slice: Option<String>,
    /// 匹配置信度 0-100
    pub confidence: i32,
    pub feedback: String,
}

/// 批改后端抽象
#[async_trait]
pub trait Grader: Send + Sync {
    /// 逐题给分，返回结果与 `questions` 一一对应、顺序一致
    async fn grade(
        &self,
        transcript: &str,
        questions: &[Question],
        strictness: Strictness,
    ) -> Result<Vec<QuestionAward>>;
}

/// 命中评分点分值求和，截断到题目满分
///
/// `matched` 为命中评分点在 `question.ideas` 中的下标。
/// 评分点分值之和允许超过题目满分，得分在此处截断。
pub fn award_for_matched_ideas(question: &Question, matched: &[usize]) -> f64 {
    let sum: f64 = matched
        .iter()
        .filter_map(|&i| question.ideas.get(i))
        .map(|idea| idea.marks)
        .sum();
    sum.clamp(0.0, question.max_marks)
}

/// 严格程度对应的关键词命中率阈值
fn match_threshold(strictness: Strictness) -> f64 {
    match strictness {
        Strictness::Strict => 0.85,
        Strictness::Standard => 0.6,
        Strictness::Lenient => 0.4,
    }
}

/// 确定性关键词批改器
///
/// 无 LLM 后端时由配置选用：从评分点描述中抽取关键词，按转写文本中的
/// 命中比例判定评分点是否得分。不理解语义，只做联调与兜底。
pub struct KeywordGrader;

impl KeywordGrader {
    /// 从评分点描述抽取关键词
    ///
    /// 拉丁文字按词切分（保留 3 字符以上），连写文字（如中文）按双字
    /// 切分，都转为小写。
    fn keywords(text: &str) -> Vec<String> {
        static TOKEN_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("token regex"));

        let lowered = text.to_lowercase();
        let mut out = Vec::new();
        for m in TOKEN_RE.find_iter(&lowered) {
            let token = m.as_str();
            if token.is_ascii() {
                if token.len() >= 3 {
                    out.push(token.to_string());
                }
            } else {
                let chars: Vec<char> = token.chars().collect();
                if chars.len() == 1 {
                    out.push(token.to_string());
                } else {
                    for pair in chars.windows(2) {
                        out.push(pair.iter().collect());
                    }
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    /// 关键词命中比例 0.0-1.0
    fn match_fraction(transcript_lower: &str, keywords: &[String]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }
        let hit = keywords
            .iter()
            .filter(|kw| transcript_lower.contains(kw.as_str()))
            .count();
        hit as f64 / keywords.len() as f64
    }
}

#[async_trait]
impl Grader for KeywordGrader {
    async fn grade(
        &self,
        transcript: &str,
        questions: &[Question],
        strictness: Strictness,
    ) -> Result<Vec<QuestionAward>> {
        let threshold = match_threshold(strictness);
        let transcript_lower = transcript.to_lowercase();

        let mut awards = Vec::with_capacity(questions.len());
        for question in questions {
            let mut matched = Vec::new();
            let mut certainty_sum = 0.0;
            for (index, idea) in question.ideas.iter().enumerate() {
                let keywords = Self::keywords(&idea.description);
                let fraction = Self::match_fraction(&transcript_lower, &keywords);
                if fraction >= threshold {
                    matched.push(index);
                }
                // 离阈值越远判定越确定
                certainty_sum += ((fraction - threshold).abs() / 0.5).min(1.0);
            }

            let confidence = if question.ideas.is_empty() {
                100
            } else {
                ((certainty_sum / question.ideas.len() as f64) * 100.0).round() as i32
            };

            let feedback = if matched.is_empty() {
                NO_ANSWER_FEEDBACK.to_string()
            } else {
                let hit: Vec<String> = matched
                    .iter()
                    .map(|&i| question.ideas[i].seq_number.to_string())
                    .collect();
                let miss: Vec<String> = (0..question.ideas.len())
                    .filter(|i| !matched.contains(i))
                    .map(|i| question.ideas[i].seq_number.to_string())
                    .collect();
                if miss.is_empty() {
                    format!("命中全部评分点（{}）", hit.join("、"))
                } else {
                    format!("命中评分点 {}；未命中评分点 {}", hit.join("、"), miss.join("、"))
                }
            };

            awards.push(QuestionAward {
                question_id: question.id,
                seq_number: question.seq_number,
                awarded_marks: award_for_matched_ideas(question, &matched),
                transcript_slice: None,
                confidence: confidence.clamp(0, 100),
                feedback,
            });
        }

        Ok(awards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::Idea;

    fn question(id: i64, seq: i32, max_marks: f64, ideas: Vec<(f64, &str)>) -> Question {
        Question {
            id,
            assessment_id: 1,
            seq_number: seq,
            prompt: format!("question {seq}"),
            max_marks,
            ideas: ideas
                .into_iter()
                .enumerate()
                .map(|(i, (marks, description))| Idea {
                    id: i as i64 + 1,
                    seq_number: i as i32 + 1,
                    description: description.to_string(),
                    marks,
                })
                .collect(),
        }
    }

    #[test]
    fn test_award_is_capped_at_question_max() {
        let q = question(1, 1, 4.0, vec![(2.0, "a"), (3.0, "b")]);
        assert_eq!(award_for_matched_ideas(&q, &[0, 1]), 4.0);
        assert_eq!(award_for_matched_ideas(&q, &[1]), 3.0);
        assert_eq!(award_for_matched_ideas(&q, &[]), 0.0);
    }

    #[tokio::test]
    async fn test_partial_credit_for_matched_ideas() {
        let questions = vec![
            question(
                1,
                1,
                10.0,
                vec![
                    (2.0, "momentum conservation equation"),
                    (3.0, "friction force calculation"),
                    (4.0, "kinetic energy theorem"),
                ],
            ),
            question(2, 2, 5.0, vec![(5.0, "electric field superposition")]),
        ];
        let transcript =
            "momentum conservation equation then friction force calculation steps shown";

        let awards = KeywordGrader
            .grade(transcript, &questions, Strictness::Standard)
            .await
            .unwrap();

        assert_eq!(awards.len(), 2);
        assert_eq!(awards[0].question_id, 1);
        assert_eq!(awards[0].awarded_marks, 5.0);
        assert_eq!(awards[1].awarded_marks, 0.0);
        assert_eq!(awards[1].feedback, NO_ANSWER_FEEDBACK);
    }

    #[tokio::test]
    async fn test_strictness_changes_threshold() {
        let questions = vec![question(1, 1, 3.0, vec![(3.0, "first second third")])];
        // 命中 3 个关键词中的 2 个，比例 0.667
        let transcript = "only first and second appear";

        let lenient = KeywordGrader
            .grade(transcript, &questions, Strictness::Lenient)
            .await
            .unwrap();
        let strict = KeywordGrader
            .grade(transcript, &questions, Strictness::Strict)
            .await
            .unwrap();

        assert_eq!(lenient[0].awarded_marks, 3.0);
        assert_eq!(strict[0].awarded_marks, 0.0);
    }

    #[tokio::test]
    async fn test_cjk_descriptions_match_by_bigram() {
        let questions = vec![question(1, 1, 4.0, vec![(4.0, "动量守恒定律")])];
        let transcript = "根据动量守恒定律列出方程";
        let awards = KeywordGrader
            .grade(transcript, &questions, Strictness::Standard)
            .await
            .unwrap();
        assert_eq!(awards[0].awarded_marks, 4.0);
    }

    #[tokio::test]
    async fn test_one_award_per_question_in_order() {
        let questions = vec![
            question(7, 1, 2.0, vec![(2.0, "alpha beta gamma")]),
            question(8, 2, 2.0, vec![(2.0, "delta epsilon zeta")]),
            question(9, 3, 2.0, vec![]),
        ];
        let awards = KeywordGrader
            .grade("nothing relevant", &questions, Strictness::Lenient)
            .await
            .unwrap();
        assert_eq!(
            awards.iter().map(|a| a.question_id).collect::<Vec<_>>(),
            vec![7, 8, 9]
        );
        assert!(awards.iter().all(|a| a.awarded_marks == 0.0));
        assert!(awards.iter().all(|a| (0..=100).contains(&a.confidence)));
    }
}
