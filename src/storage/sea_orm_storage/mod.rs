//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assessments;
mod question_results;
mod submission_files;
mod submissions;

use crate::config::AppConfig;
use crate::errors::{MarkSystemError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| MarkSystemError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| MarkSystemError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| MarkSystemError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| MarkSystemError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(MarkSystemError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    assessments::{
        entities::{Assessment, AssessmentWithScheme},
        requests::{AssessmentListQuery, CreateAssessmentRequest},
        responses::AssessmentListResponse,
    },
    submissions::{
        entities::{QuestionResult, Submission, SubmissionFile},
        requests::{NewQuestionResult, NewSubmissionFile, SubmissionListQuery},
        responses::SubmissionListResponse,
    },
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 测评模块
    async fn create_assessment(
        &self,
        created_by: i64,
        request: CreateAssessmentRequest,
    ) -> Result<Assessment> {
        self.create_assessment_impl(created_by, request).await
    }

    async fn get_assessment_by_id(&self, id: i64) -> Result<Option<Assessment>> {
        self.get_assessment_by_id_impl(id).await
    }

    async fn get_assessment_with_mark_scheme(
        &self,
        id: i64,
    ) -> Result<Option<AssessmentWithScheme>> {
        self.get_assessment_with_mark_scheme_impl(id).await
    }

    async fn list_assessments_with_pagination(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse> {
        self.list_assessments_with_pagination_impl(query).await
    }

    async fn delete_assessment(&self, id: i64) -> Result<bool> {
        self.delete_assessment_impl(id).await
    }

    async fn count_submissions_by_assessment(&self, assessment_id: i64) -> Result<i64> {
        self.count_submissions_by_assessment_impl(assessment_id)
            .await
    }

    // 提交模块
    async fn create_submission(
        &self,
        assessment_id: i64,
        student_id: i64,
        max_marks: f64,
    ) -> Result<Submission> {
        self.create_submission_impl(assessment_id, student_id, max_marks)
            .await
    }

    async fn get_submission_by_id(&self, id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(id).await
    }

    async fn get_submission_by_assessment_and_student(
        &self,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        self.get_submission_by_assessment_and_student_impl(assessment_id, student_id)
            .await
    }

    async fn list_submissions_with_pagination(
        &self,
        assessment_id: i64,
        query: SubmissionListQuery,
    ) -> Result<SubmissionListResponse> {
        self.list_submissions_with_pagination_impl(assessment_id, query)
            .await
    }

    async fn attach_files(
        &self,
        submission_id: i64,
        files: Vec<NewSubmissionFile>,
    ) -> Result<Vec<SubmissionFile>> {
        self.attach_files_impl(submission_id, files).await
    }

    async fn get_submission_files(&self, submission_id: i64) -> Result<Vec<SubmissionFile>> {
        self.get_submission_files_impl(submission_id).await
    }

    // 批改状态机模块
    async fn try_begin_grading(&self, submission_id: i64) -> Result<bool> {
        self.try_begin_grading_impl(submission_id).await
    }

    async fn mark_graded(&self, submission_id: i64, total_marks: f64) -> Result<()> {
        self.mark_graded_impl(submission_id, total_marks).await
    }

    async fn mark_failed(&self, submission_id: i64, reason: &str) -> Result<()> {
        self.mark_failed_impl(submission_id, reason).await
    }

    // 逐题结果模块
    async fn save_question_results(
        &self,
        submission_id: i64,
        results: Vec<NewQuestionResult>,
    ) -> Result<()> {
        self.save_question_results_impl(submission_id, results)
            .await
    }

    async fn get_question_results(&self, submission_id: i64) -> Result<Vec<QuestionResult>> {
        self.get_question_results_impl(submission_id).await
    }

    // 改分模块
    async fn adjust_submission_score(
        &self,
        submission_id: i64,
        new_score: f64,
        adjusted_by: i64,
        reason: &str,
    ) -> Result<Option<Submission>> {
        self.adjust_submission_score_impl(submission_id, new_score, adjusted_by, reason)
            .await
    }
}
