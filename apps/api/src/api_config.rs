use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use demodeck_application::DEFAULT_MAX_CONCURRENT_DEPLOYMENTS;
use demodeck_core::AppError;
use demodeck_infrastructure::{
    DEFAULT_GIT_COMMAND_TIMEOUT, DEFAULT_PERMISSION_CACHE_CAPACITY, DEFAULT_PERMISSION_CACHE_TTL,
};
use tracing_subscriber::EnvFilter;


#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub webhook_secret: String,
    pub static_root: PathBuf,
    pub workspace_root: PathBuf,
    pub ssh_private_key_path: Option<PathBuf>,
    pub git_command_timeout: Duration,
    pub max_concurrent_deployments: usize,
    pub permission_cache_ttl: Duration,
    pub permission_cache_capacity: usize,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(env::args().nth(1).as_deref(), |name| env::var(name).ok())
    }

    fn from_lookup(
        first_arg: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let migrate_only = first_arg == Some("migrate");

        let database_url = required_non_empty(&lookup, "DATABASE_URL")?;
        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let session_secret = required_non_empty(&lookup, "SESSION_SECRET")?;
        if session_secret.len() < 32 {
            return Err(AppError::Validation(
                "SESSION_SECRET must be at least 32 characters".to_owned(),
            ));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = lookup("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cookie_secure = lookup("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let webhook_secret = required_non_empty(&lookup, "GITHUB_WEBHOOK_SECRET")?;

        let data_path = PathBuf::from(lookup("DATA_PATH").unwrap_or_else(|| "./data".to_owned()));
        let ssh_private_key_path = lookup("GIT_SSH_PRIVATE_KEY_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let git_command_timeout = Duration::from_secs(parsed(
            &lookup,
            "GIT_COMMAND_TIMEOUT_SECONDS",
            DEFAULT_GIT_COMMAND_TIMEOUT.as_secs(),
        )?);
        let max_concurrent_deployments = parsed(
            &lookup,
            "DEPLOY_MAX_CONCURRENCY",
            DEFAULT_MAX_CONCURRENT_DEPLOYMENTS,
        )?;
        let permission_cache_ttl = Duration::from_secs(parsed(
            &lookup,
            "PERMISSION_CACHE_TTL_SECONDS",
            DEFAULT_PERMISSION_CACHE_TTL.as_secs(),
        )?);
        let permission_cache_capacity = parsed(
            &lookup,
            "PERMISSION_CACHE_CAPACITY",
            DEFAULT_PERMISSION_CACHE_CAPACITY,
        )?;

        if git_command_timeout.is_zero() {
            return Err(AppError::Validation(
                "GIT_COMMAND_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }
        if max_concurrent_deployments == 0 {
            return Err(AppError::Validation(
                "DEPLOY_MAX_CONCURRENCY must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            webhook_secret,
            static_root: data_path.join("static_demos"),
            workspace_root: data_path.join("git_workspaces"),
            ssh_private_key_path,
            git_command_timeout,
            max_concurrent_deployments,
            permission_cache_ttl,
            permission_cache_capacity,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}
