use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Writing index backend for a portfolio site")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the writing index over HTTP, refreshing content periodically.
    Serve(Box<ServeArgs>),
    /// Write the paged writing index, sitemap, and robots.txt to a directory.
    Export(ExportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

/// Flags shared by every command that loads content.
#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Content source kind (cms|directory).
    #[arg(long = "content-source", value_name = "KIND")]
    pub source: Option<String>,

    /// Directory of Markdown articles for the directory source.
    #[arg(long = "content-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Base URL of the CMS query API.
    #[arg(long = "content-api-base", value_name = "URL")]
    pub api_base: Option<String>,

    /// CMS dataset name.
    #[arg(long = "content-dataset", value_name = "NAME")]
    pub dataset: Option<String>,

    /// Override the log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Public base URL used for sitemap entries.
    #[arg(long = "site-public-url", value_name = "URL")]
    pub site_public_url: Option<String>,

    /// Articles per listing page.
    #[arg(long = "writing-page-size", value_name = "COUNT")]
    pub writing_page_size: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Seconds between content refreshes; 0 disables refreshing.
    #[arg(long = "content-refresh-seconds", value_name = "SECONDS")]
    pub content_refresh_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Directory to write the export into; created when missing.
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,
}
