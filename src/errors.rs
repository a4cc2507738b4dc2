use std::fmt;

#[derive(Debug, Clone)]
pub enum GeoError {
    InvalidInput(String),
    NotFound(String),
    QuotaExceeded(String),
    StoreUnavailable(String),
    DatasetLoadFailed(String),
    ResolutionFailed(String),
    Config(String),
    Internal(String),
}

impl GeoError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoError::InvalidInput(_) => "E001",
            GeoError::NotFound(_) => "E002",
            GeoError::QuotaExceeded(_) => "E003",
            GeoError::StoreUnavailable(_) => "E004",
            GeoError::DatasetLoadFailed(_) => "E005",
            GeoError::ResolutionFailed(_) => "E006",
            GeoError::Config(_) => "E007",
            GeoError::Internal(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoError::InvalidInput(_) => "Invalid Input",
            GeoError::NotFound(_) => "Not Found",
            GeoError::QuotaExceeded(_) => "Quota Exceeded",
            GeoError::StoreUnavailable(_) => "Counter Store Unavailable",
            GeoError::DatasetLoadFailed(_) => "Dataset Load Failed",
            GeoError::ResolutionFailed(_) => "Hostname Resolution Failed",
            GeoError::Config(_) => "Configuration Error",
            GeoError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeoError::InvalidInput(msg) => msg,
            GeoError::NotFound(msg) => msg,
            GeoError::QuotaExceeded(msg) => msg,
            GeoError::StoreUnavailable(msg) => msg,
            GeoError::DatasetLoadFailed(msg) => msg,
            GeoError::ResolutionFailed(msg) => msg,
            GeoError::Config(msg) => msg,
            GeoError::Internal(msg) => msg,
        }
    }

    /// HTTP status code surfaced at the request boundary.
    ///
    /// Resolution failures are reported to callers as bad input; a dataset
    /// load failure only reaches a request if no dataset was ever loaded.
    pub fn status_code(&self) -> u16 {
        match self {
            GeoError::InvalidInput(_) | GeoError::ResolutionFailed(_) => 400,
            GeoError::QuotaExceeded(_) => 403,
            GeoError::NotFound(_) => 404,
            GeoError::StoreUnavailable(_)
            | GeoError::DatasetLoadFailed(_)
            | GeoError::Config(_) => 503,
            GeoError::Internal(_) => 500,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式启动失败）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoError {}

// 便捷的构造函数
impl GeoError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GeoError::InvalidInput(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GeoError::NotFound(msg.into())
    }

    pub fn quota_exceeded<T: Into<String>>(msg: T) -> Self {
        GeoError::QuotaExceeded(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        GeoError::StoreUnavailable(msg.into())
    }

    pub fn dataset_load_failed<T: Into<String>>(msg: T) -> Self {
        GeoError::DatasetLoadFailed(msg.into())
    }

    pub fn resolution_failed<T: Into<String>>(msg: T) -> Self {
        GeoError::ResolutionFailed(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        GeoError::Config(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        GeoError::Internal(msg.into())
    }
}

impl From<std::io::Error> for GeoError {
    fn from(err: std::io::Error) -> Self {
        GeoError::DatasetLoadFailed(err.to_string())
    }
}

impl From<serde_json::Error> for GeoError {
    fn from(err: serde_json::Error) -> Self {
        GeoError::DatasetLoadFailed(err.to_string())
    }
}

impl From<sea_orm::sqlx::Error> for GeoError {
    fn from(err: sea_orm::sqlx::Error) -> Self {
        GeoError::DatasetLoadFailed(err.to_string())
    }
}

impl From<redis::RedisError> for GeoError {
    fn from(err: redis::RedisError) -> Self {
        GeoError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GeoError::invalid_input("x").status_code(), 400);
        assert_eq!(GeoError::resolution_failed("x").status_code(), 400);
        assert_eq!(GeoError::quota_exceeded("x").status_code(), 403);
        assert_eq!(GeoError::not_found("x").status_code(), 404);
        assert_eq!(GeoError::store_unavailable("x").status_code(), 503);
        assert_eq!(GeoError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = GeoError::not_found("no record for 8.8.8.8");
        assert_eq!(err.to_string(), "Not Found: no record for 8.8.8.8");
        assert_eq!(err.code(), "E002");
    }
}
