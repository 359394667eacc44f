//! API 业务错误码
//!
//! 与 HTTP 状态码分离：HTTP 状态码表达传输层语义，业务错误码表达领域语义。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,

    // 测评
    AssessmentNotFound = 1001,
    AssessmentClosed = 1002,
    AssessmentHasSubmissions = 1003,

    // 提交与批改
    SubmissionNotFound = 2001,
    SubmissionAlreadyExists = 2002,
    SubmissionNotGraded = 2003,
    GradingInProgress = 2004,
    GradingFailed = 2005,
    InvalidAdjustment = 2006,

    // 文件
    FileUploadFailed = 3001,
    FileTypeNotAllowed = 3002,
    FileSizeExceeded = 3003,
    EmptyUpload = 3004,
}
