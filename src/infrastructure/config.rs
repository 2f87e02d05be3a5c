//! 配置基础设施
//!
//! 启动时从环境变量解析一次，之后通过参数显式传递给各层。

use std::{
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

pub const ENV_DB_USER: &str = "POSTGRES_USER";
pub const ENV_DB_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DB_HOST: &str = "POSTGRES_HOST";
pub const ENV_DB_PORT: &str = "POSTGRES_PORT";
pub const ENV_DB_NAME: &str = "POSTGRES_DB";

pub const ENV_BIND: &str = "PRODUCT_SERVICE_BIND";
pub const ENV_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT: &str = "DB_ACQUIRE_TIMEOUT_SECS";
pub const ENV_QUERY_TIMEOUT: &str = "DB_QUERY_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "HTTP_REQUEST_TIMEOUT_SECS";
pub const ENV_FAILURE_MODE: &str = "STORE_FAILURE_MODE";

const DEFAULT_BIND: &str = "0.0.0.0:5001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 配置错误，启动阶段即为致命错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// 加载当前目录（或上级目录）下的 `.env`，不覆盖已有变量。文件不存在不算错误。
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    ignore_missing(dotenvy::dotenv().map(Some))
}

/// 加载指定路径的 env 文件，文件不存在不算错误
pub fn load_dotenv_from(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    ignore_missing(dotenvy::from_path(path).map(|_| Some(path.to_path_buf())))
}

fn ignore_missing(
    result: Result<Option<PathBuf>, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Err(e) if e.not_found() => Ok(None),
        other => other,
    }
}

/// 数据库存储故障时对外的呈现方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// 返回 200 和空数组
    #[default]
    Empty,
    /// 返回 503
    Unavailable,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(FailureMode::Empty),
            "unavailable" => Ok(FailureMode::Unavailable),
            other => Err(format!("expected `empty` or `unavailable`, got `{}`", other)),
        }
    }
}

/// 数据库连接描述
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// 可安全写入日志的连接串
    pub fn redacted_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub request_timeout: Duration,
    pub failure_mode: FailureMode,
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// 从进程环境读取配置，`.env` 需先由 [`load_dotenv`] 加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意查找函数解析配置，空字符串视为缺失
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = [ENV_DB_USER, ENV_DB_PASSWORD, ENV_DB_HOST, ENV_DB_PORT, ENV_DB_NAME];
        let missing: Vec<&'static str> = required
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        // 以上已确认全部存在
        let value = |key: &str| get(key).unwrap_or_default();

        let database = DatabaseConfig {
            user: value(ENV_DB_USER),
            password: value(ENV_DB_PASSWORD),
            host: value(ENV_DB_HOST),
            port: parse_value(ENV_DB_PORT, &value(ENV_DB_PORT))?,
            database: value(ENV_DB_NAME),
        };

        let max_connections: u32 =
            parse_or(ENV_MAX_CONNECTIONS, get(ENV_MAX_CONNECTIONS), DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: ENV_MAX_CONNECTIONS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let pool = PoolConfig {
            max_connections,
            acquire_timeout: parse_secs(
                ENV_ACQUIRE_TIMEOUT,
                get(ENV_ACQUIRE_TIMEOUT),
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            query_timeout: parse_secs(
                ENV_QUERY_TIMEOUT,
                get(ENV_QUERY_TIMEOUT),
                DEFAULT_QUERY_TIMEOUT_SECS,
            )?,
        };

        let server = ServerConfig {
            bind: match get(ENV_BIND) {
                Some(raw) => parse_value(ENV_BIND, &raw)?,
                None => parse_value(ENV_BIND, DEFAULT_BIND)?,
            },
            request_timeout: parse_secs(
                ENV_REQUEST_TIMEOUT,
                get(ENV_REQUEST_TIMEOUT),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            failure_mode: parse_or(ENV_FAILURE_MODE, get(ENV_FAILURE_MODE), FailureMode::default())?,
        };

        // 请求超时必须晚于查询超时，否则存储变慢时会先返回 408
        if server.request_timeout <= pool.query_timeout {
            return Err(ConfigError::Invalid {
                name: ENV_REQUEST_TIMEOUT,
                value: server.request_timeout.as_secs().to_string(),
                reason: format!(
                    "must be greater than {} ({}s)",
                    ENV_QUERY_TIMEOUT,
                    pool.query_timeout.as_secs()
                ),
            });
        }

        Ok(Self {
            database,
            pool,
            server,
        })
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_secs(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(name, raw, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}
