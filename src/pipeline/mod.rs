//! 提交批改流水线
//!
//! 数据单向流动：图像归一化 → 文本识别 → 评分标准匹配 → 聚合落库。
//!
//! - `normalize`: 单页图像归一化（EXIF 转正、横竖转换、统一编码）
//! - `extract`: 文本识别服务（并行归一化、顺序分批、合并转写文本）
//! - `grade`: 评分标准匹配与逐题给分
//! - `backend`: 调用 LLM 后端的识别/批改实现
//! - `aggregator`: 整卷批改编排与状态机

pub mod aggregator;
pub mod backend;
pub mod extract;
pub mod grade;
pub mod normalize;
