use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "geoipd.toml";

/// Counter store backing the quota gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotaBackend {
    #[default]
    Redis,
    Memory,
}

impl std::fmt::Display for QuotaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for QuotaBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(format!(
                "Invalid quota backend: '{}'. Valid: redis, memory",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、代理头
/// - cors: 跨域来源
/// - dataset: 数据集路径与自动重载间隔
/// - quota: 配额窗口与阈值
/// - redis: 计数器存储连接
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：GEOIPD，分隔符：__
    /// 示例：GEOIPD__QUOTA__MAX_REQUESTS=50
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("GEOIPD")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for the client address.
    #[serde(default)]
    pub xheaders: bool,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin, comma separated for several. `*` echoes the request
    /// origin; empty disables cross-origin access.
    #[serde(default = "default_cors_origin")]
    pub origin: String,
    /// Preflight cache lifetime in seconds.
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

impl CorsConfig {
    pub fn origins(&self) -> Vec<&str> {
        self.origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .collect()
    }
}

/// 数据集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
    /// Autoreload interval in seconds.
    #[serde(default = "default_reload_interval")]
    pub reload_interval: u64,
}

/// 配额配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default)]
    pub backend: QuotaBackend,
    #[serde(default = "default_expire_seconds")]
    pub expire_seconds: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Connect over a unix socket instead of TCP when set.
    #[serde(default)]
    pub unix_socket: Option<String>,
    #[serde(default)]
    pub db: i64,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

impl RedisConfig {
    pub fn connection_url(&self) -> String {
        match self.unix_socket {
            Some(ref socket) if !socket.is_empty() => {
                format!("redis+unix://{}?db={}", socket, self.db)
            }
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_dataset_path() -> String {
    "ipdb.sqlite".to_string()
}

fn default_reload_interval() -> u64 {
    60
}

fn default_expire_seconds() -> u64 {
    3600
}

fn default_max_requests() -> u64 {
    1000
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_key_prefix() -> String {
    "geoipd:".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    1500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            xheaders: false,
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: default_cors_origin(),
            max_age: default_cors_max_age(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            reload_interval: default_reload_interval(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            backend: QuotaBackend::default(),
            expire_seconds: default_expire_seconds(),
            max_requests: default_max_requests(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            unix_socket: None,
            db: 0,
            pool_size: default_redis_pool_size(),
            key_prefix: default_redis_key_prefix(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.quota.expire_seconds, 3600);
        assert_eq!(config.quota.max_requests, 1000);
        assert_eq!(config.quota.backend, QuotaBackend::Redis);
        assert_eq!(config.dataset.reload_interval, 60);
        assert_eq!(config.redis.pool_size, 10);
    }

    #[test]
    fn test_redis_connection_url() {
        let mut redis = RedisConfig {
            db: 2,
            ..Default::default()
        };
        assert_eq!(redis.connection_url(), "redis://127.0.0.1:6379/2");

        redis.unix_socket = Some("/tmp/redis.sock".to_string());
        assert_eq!(redis.connection_url(), "redis+unix:///tmp/redis.sock?db=2");
    }

    #[test]
    fn test_cors_origins() {
        let mut cors = CorsConfig::default();
        assert_eq!(cors.origins(), vec!["*"]);

        cors.origin = "https://a.example, https://b.example".to_string();
        assert_eq!(cors.origins(), vec!["https://a.example", "https://b.example"]);

        cors.origin = String::new();
        assert!(cors.origins().is_empty());
    }

    #[test]
    fn test_quota_backend_parse() {
        assert_eq!("Memory".parse::<QuotaBackend>(), Ok(QuotaBackend::Memory));
        assert!("etcd".parse::<QuotaBackend>().is_err());
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.redis.key_prefix, "geoipd:");
    }
}
