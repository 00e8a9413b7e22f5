//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::{
    content::DEFAULT_ARTICLES_QUERY,
    pagination::DEFAULT_PAGE_SIZE,
    retry::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryPolicy},
};
use crate::domain::images::DEFAULT_IMAGE_WIDTH;

pub use cli::{CliArgs, Command, ContentOverrides, ExportArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_DIRECTORY: &str = "content/writing";
const DEFAULT_DATASET: &str = "production";
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IMAGE_CDN_BASE: &str = "https://cdn.sanity.io/";
const DEFAULT_PUBLIC_SITE_URL: &str = "http://localhost:3000/";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub images: ImageSettings,
    pub retry: RetryPolicy,
    pub site: SiteSettings,
    pub writing: WritingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub source: ContentSourceSettings,
    pub query: String,
    /// `None` when periodic refresh is disabled.
    pub refresh_interval: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSourceSettings {
    Cms {
        api_base: Url,
        dataset: String,
        token: Option<String>,
        timeout: Duration,
    },
    Directory {
        path: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub cdn_base: Url,
    pub project_id: String,
    pub dataset: String,
    pub width: u32,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub public_url: Url,
}

#[derive(Debug, Clone)]
pub struct WritingSettings {
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Export(args)) => raw.apply_content_overrides(&args.content),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    images: RawImageSettings,
    retry: RawRetrySettings,
    site: RawSiteSettings,
    writing: RawWritingSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.content_refresh_seconds {
            self.content.refresh_seconds = Some(seconds);
        }

        self.apply_content_overrides(&overrides.content);
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(source) = overrides.source.as_ref() {
            self.content.source = Some(source.clone());
        }
        if let Some(directory) = overrides.directory.as_ref() {
            self.content.directory = Some(directory.clone());
        }
        if let Some(api_base) = overrides.api_base.as_ref() {
            self.content.api_base = Some(api_base.clone());
        }
        if let Some(dataset) = overrides.dataset.as_ref() {
            self.content.dataset = Some(dataset.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.site_public_url.as_ref() {
            self.site.public_url = Some(url.clone());
        }
        if let Some(size) = overrides.writing_page_size {
            self.writing.page_size = Some(size);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            images,
            retry,
            site,
            writing,
        } = raw;

        let dataset = non_empty(content.dataset.clone()).unwrap_or_else(|| DEFAULT_DATASET.into());
        let project_id = non_empty(content.project_id.clone()).unwrap_or_default();

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let images = build_image_settings(images, project_id, dataset.clone())?;
        let content = build_content_settings(content, dataset)?;
        let retry = build_retry_policy(retry)?;
        let site = build_site_settings(site)?;
        let writing = build_writing_settings(writing)?;

        Ok(Self {
            server,
            logging,
            content,
            images,
            retry,
            site,
            writing,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(
    content: RawContentSettings,
    dataset: String,
) -> Result<ContentSettings, LoadError> {
    let kind = non_empty(content.source).unwrap_or_else(|| "directory".to_string());
    let source = match kind.to_ascii_lowercase().as_str() {
        "cms" => {
            let api_base = non_empty(content.api_base).ok_or_else(|| {
                LoadError::invalid("content.api_base", "required when content.source is `cms`")
            })?;
            let api_base = parse_http_url(&api_base)
                .map_err(|reason| LoadError::invalid("content.api_base", reason))?;

            let timeout_secs = content
                .timeout_seconds
                .unwrap_or(DEFAULT_CONTENT_TIMEOUT_SECS);
            if timeout_secs == 0 {
                return Err(LoadError::invalid(
                    "content.timeout_seconds",
                    "must be greater than zero",
                ));
            }

            ContentSourceSettings::Cms {
                api_base,
                dataset,
                token: non_empty(content.token),
                timeout: Duration::from_secs(timeout_secs),
            }
        }
        "directory" => {
            let path = content
                .directory
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIRECTORY));
            ContentSourceSettings::Directory { path }
        }
        other => {
            return Err(LoadError::invalid(
                "content.source",
                format!("unknown source `{other}`; expected `cms` or `directory`"),
            ));
        }
    };

    let refresh_secs = content.refresh_seconds.unwrap_or(DEFAULT_REFRESH_SECS);
    let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

    Ok(ContentSettings {
        source,
        query: non_empty(content.query).unwrap_or_else(|| DEFAULT_ARTICLES_QUERY.to_string()),
        refresh_interval,
    })
}

fn build_image_settings(
    images: RawImageSettings,
    project_id: String,
    dataset: String,
) -> Result<ImageSettings, LoadError> {
    let cdn_base = non_empty(images.cdn_base).unwrap_or_else(|| DEFAULT_IMAGE_CDN_BASE.into());
    let cdn_base =
        parse_http_url(&cdn_base).map_err(|reason| LoadError::invalid("images.cdn_base", reason))?;

    let width = non_zero_u32(
        images.width.unwrap_or(DEFAULT_IMAGE_WIDTH.into()),
        "images.width",
    )?;

    Ok(ImageSettings {
        cdn_base,
        project_id,
        dataset,
        width: width.get(),
    })
}

fn build_retry_policy(retry: RawRetrySettings) -> Result<RetryPolicy, LoadError> {
    let max_attempts = match retry.max_attempts {
        Some(value) => non_zero_u32(value, "retry.max_attempts")?,
        None => DEFAULT_MAX_ATTEMPTS,
    };
    let initial_delay = retry
        .initial_delay_ms
        .map_or(DEFAULT_INITIAL_DELAY, Duration::from_millis);
    let max_delay = retry
        .max_delay_ms
        .map_or(DEFAULT_MAX_DELAY, Duration::from_millis);

    if max_delay < initial_delay {
        return Err(LoadError::invalid(
            "retry.max_delay_ms",
            "must not be smaller than retry.initial_delay_ms",
        ));
    }

    Ok(RetryPolicy {
        max_attempts,
        initial_delay,
        max_delay,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let public_url = non_empty(site.public_url).unwrap_or_else(|| DEFAULT_PUBLIC_SITE_URL.into());
    let public_url = parse_http_url(&public_url)
        .map_err(|reason| LoadError::invalid("site.public_url", reason))?;
    Ok(SiteSettings { public_url })
}

fn build_writing_settings(writing: RawWritingSettings) -> Result<WritingSettings, LoadError> {
    let page_size = match writing.page_size {
        Some(0) => {
            return Err(LoadError::invalid(
                "writing.page_size",
                "must be greater than zero",
            ));
        }
        Some(value) => usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                LoadError::invalid("writing.page_size", "value exceeds supported range")
            })?,
        None => DEFAULT_PAGE_SIZE,
    };
    Ok(WritingSettings { page_size })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    source: Option<String>,
    directory: Option<PathBuf>,
    api_base: Option<String>,
    dataset: Option<String>,
    project_id: Option<String>,
    token: Option<String>,
    query: Option<String>,
    refresh_seconds: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    cdn_base: Option<String>,
    width: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    max_attempts: Option<u64>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWritingSettings {
    page_size: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| format!("invalid url `{value}`: {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme `{other}` in `{value}`")),
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
