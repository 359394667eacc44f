//! 文件存储
//!
//! 提交页面文件通过 `FileStore` 抽象存取，调用方只持有后端返回的
//! 不透明定位符（locator），不感知落盘路径或存储介质。
//! 当前实现为本地磁盘存储，后续可替换为对象存储。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{MarkSystemError, Result};

/// 文件存储后端抽象
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 存入一份文件，返回定位符
    async fn store(&self, data: &[u8], original_name: &str, content_type: &str) -> Result<String>;

    /// 按定位符读回文件内容
    async fn load(&self, locator: &str) -> Result<Vec<u8>>;

    /// 按定位符删除文件，文件不存在不视为错误
    async fn delete(&self, locator: &str) -> Result<()>;
}

/// 本地磁盘存储
///
/// 文件落在配置的上传目录下，文件名由时间戳和 UUID 生成，
/// 不保留用户提供的文件名（避免路径注入与重名覆盖）。
pub struct LocalFileStore {
    base_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 按配置的上传目录创建
    pub fn from_config() -> Self {
        Self::new(&AppConfig::get().upload.dir)
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf> {
        // 定位符由本存储生成，不应含路径分隔符
        if locator.contains('/') || locator.contains('\\') || locator.contains("..") {
            return Err(MarkSystemError::validation(format!(
                "非法的文件定位符: {locator}"
            )));
        }
        Ok(self.base_dir.join(locator))
    }

    fn extension_of(original_name: &str) -> &str {
        Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, data: &[u8], original_name: &str, content_type: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let locator = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            Self::extension_of(original_name)
        );
        let path = self.base_dir.join(&locator);

        tokio::fs::write(&path, data).await?;
        debug!(
            "文件已存储: {} ({}, {} 字节) -> {}",
            original_name,
            content_type,
            data.len(),
            locator
        );
        Ok(locator)
    }

    async fn load(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.resolve(locator)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                MarkSystemError::not_found(format!("文件不存在: {locator}")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let path = self.resolve(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalFileStore {
        let dir = std::env::temp_dir().join(format!("marksys-files-{}", Uuid::new_v4()));
        LocalFileStore::new(dir)
    }

    #[tokio::test]
    async fn test_store_and_load_roundtrip() {
        let store = temp_store();
        let locator = store
            .store(b"page bytes", "page1.jpg", "image/jpeg")
            .await
            .unwrap();
        assert!(locator.ends_with(".jpg"));
        let data = store.load(&locator).await.unwrap();
        assert_eq!(data, b"page bytes");
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let store = temp_store();
        store.store(b"x", "a.png", "image/png").await.unwrap();
        let err = store.load("1700000000-deadbeef.png").await.unwrap_err();
        assert_eq!(err.error_type(), "Resource Not Found");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = temp_store();
        let locator = store.store(b"x", "a.png", "image/png").await.unwrap();
        store.delete(&locator).await.unwrap();
        // 第二次删除同样成功
        store.delete(&locator).await.unwrap();
        assert!(store.load(&locator).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_locator() {
        let store = temp_store();
        assert!(store.load("../etc/passwd").await.is_err());
        assert!(store.delete("a/b.png").await.is_err());
    }
}
