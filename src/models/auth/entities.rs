use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../frontend/src/types/generated/auth.ts")]
pub enum UserRole {
    Teacher,
    Student,
    Admin,
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// 经认证的调用者身份
///
/// 由 RequireJWT 中间件从已验签的 claims 构造并注入请求扩展。
/// 登录与用户档案由外部认证服务负责，这里只信任签名后的身份。
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/auth.ts")]
pub struct AuthUser {
    pub id: i64,
    pub role: UserRole,
}
