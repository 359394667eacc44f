//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_marksystem_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum MarkSystemError {
            $($variant(String),)*
        }

        impl MarkSystemError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(MarkSystemError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(MarkSystemError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(MarkSystemError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl MarkSystemError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        MarkSystemError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_marksystem_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    FileOperation("E004", "File Operation Error"),
    Validation("E005", "Validation Error"),
    NotFound("E006", "Resource Not Found"),
    Serialization("E007", "Serialization Error"),
    Authentication("E008", "Authentication Error"),
    Authorization("E009", "Authorization Error"),
    ExtractionConfig("E010", "Extraction Backend Configuration Error"),
    ExtractionCall("E011", "Extraction Backend Call Error"),
    GradingCall("E012", "Grading Backend Call Error"),
    ImageProcess("E013", "Image Processing Error"),
    PipelineTimeout("E014", "Grading Pipeline Timeout"),
    PipelineBusy("E015", "Grading Already In Progress"),
}

impl MarkSystemError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MarkSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MarkSystemError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for MarkSystemError {
    fn from(err: sea_orm::DbErr) -> Self {
        MarkSystemError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for MarkSystemError {
    fn from(err: std::io::Error) -> Self {
        MarkSystemError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for MarkSystemError {
    fn from(err: serde_json::Error) -> Self {
        MarkSystemError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for MarkSystemError {
    fn from(err: reqwest::Error) -> Self {
        MarkSystemError::ExtractionCall(err.to_string())
    }
}

impl From<image::ImageError> for MarkSystemError {
    fn from(err: image::ImageError) -> Self {
        MarkSystemError::ImageProcess(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarkSystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(MarkSystemError::database_config("test").code(), "E001");
        assert_eq!(MarkSystemError::validation("test").code(), "E005");
        assert_eq!(MarkSystemError::extraction_config("test").code(), "E010");
        assert_eq!(MarkSystemError::pipeline_timeout("test").code(), "E014");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            MarkSystemError::extraction_call("test").error_type(),
            "Extraction Backend Call Error"
        );
        assert_eq!(
            MarkSystemError::validation("test").error_type(),
            "Validation Error"
        );
    }

    #[test]
    fn test_error_message() {
        let err = MarkSystemError::grading_call("backend returned garbage");
        assert_eq!(err.message(), "backend returned garbage");
    }

    #[test]
    fn test_format_simple() {
        let err = MarkSystemError::pipeline_busy("submission 42");
        let formatted = err.format_simple();
        assert!(formatted.contains("Grading Already In Progress"));
        assert!(formatted.contains("submission 42"));
    }
}
