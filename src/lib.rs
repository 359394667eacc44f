//! MarkSystem - 智能测评批改平台后端服务
//!
//! 基于 Actix Web 构建的测评批改系统后端：学生上传手写作答，系统
//! 完成图像归一化、文本识别、评分标准匹配并产出逐题得分。
//!
//! # 架构
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `files`: 提交文件存储
//! - `middlewares`: 认证授权中间件
//! - `models`: 数据模型定义
//! - `pipeline`: 批改流水线（归一化/识别/评分/编排）
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM）
//! - `utils`: 工具函数

pub mod config;
pub mod entity;
pub mod errors;
pub mod files;
pub mod middlewares;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
