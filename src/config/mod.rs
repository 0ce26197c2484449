//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroU32,
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tcm-webui";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4343;
const DEFAULT_STATIC_ROOT: &str = "static";
const DEFAULT_TEMPLATE_ROOT: &str = "templates";
const DEFAULT_INSTALL_ROOT: &str = ".";
pub(crate) const DEFAULT_CONTAINER_ROOT: &str = "/config";
pub(crate) const DEFAULT_FONT_DIRECTORY: &str = "/config/fonts";
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_SEARCH_LIMIT: u32 = 15;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub paths: PathSettings,
    pub preview: PreviewSettings,
    pub render: RenderSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Filesystem locations the service reads from.
#[derive(Debug, Clone)]
pub struct PathSettings {
    /// Explicit preferences file, taking precedence over every fallback.
    pub preferences_override: Option<PathBuf>,
    pub is_docker: bool,
    /// Root the relative `config/preferences.yml` fallback is resolved against.
    pub install_root: PathBuf,
    /// Directory holding the container-default `preferences.yml` and `tv.yml`.
    pub container_root: PathBuf,
    pub static_root: PathBuf,
    pub template_root: PathBuf,
    pub font_directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub scratch_dir: PathBuf,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub fallback_font: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub result_limit: NonZeroU32,
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

    builder = builder.add_source(Environment::with_prefix("TCM_WEBUI").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(cli);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Files) | None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
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
    paths: RawPathSettings,
    preview: RawPreviewSettings,
    render: RawRenderSettings,
    search: RawSearchSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, cli: &CliArgs) {
        if let Some(path) = cli.preferences.as_ref() {
            self.paths.preferences_file = Some(path.clone());
        }
        if let Some(docker) = cli.is_docker {
            self.paths.docker = Some(docker);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.static_root.as_ref() {
            self.paths.static_root = Some(path.clone());
        }
        if let Some(path) = overrides.template_root.as_ref() {
            self.paths.template_root = Some(path.clone());
        }
        if let Some(path) = overrides.font_directory.as_ref() {
            self.paths.font_directory = Some(path.clone());
        }
        if let Some(path) = overrides.preview_scratch_dir.as_ref() {
            self.preview.scratch_dir = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            paths,
            preview,
            render,
            search,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            paths: build_path_settings(paths)?,
            preview: build_preview_settings(preview)?,
            render: build_render_settings(render),
            search: build_search_settings(search)?,
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

    Ok(ServerSettings { addr })
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

fn build_path_settings(paths: RawPathSettings) -> Result<PathSettings, LoadError> {
    let preferences_override = paths
        .preferences_file
        .filter(|path| !path.as_os_str().is_empty());

    let container_root = non_empty_path(
        paths.container_root,
        DEFAULT_CONTAINER_ROOT,
        "paths.container_root",
    )?;
    let install_root = non_empty_path(
        paths.install_root,
        DEFAULT_INSTALL_ROOT,
        "paths.install_root",
    )?;
    let static_root = non_empty_path(paths.static_root, DEFAULT_STATIC_ROOT, "paths.static_root")?;
    let template_root = non_empty_path(
        paths.template_root,
        DEFAULT_TEMPLATE_ROOT,
        "paths.template_root",
    )?;
    let font_directory = non_empty_path(
        paths.font_directory,
        DEFAULT_FONT_DIRECTORY,
        "paths.font_directory",
    )?;

    Ok(PathSettings {
        preferences_override,
        is_docker: paths.docker.unwrap_or(false),
        install_root,
        container_root,
        static_root,
        template_root,
        font_directory,
    })
}

fn build_preview_settings(preview: RawPreviewSettings) -> Result<PreviewSettings, LoadError> {
    let scratch_dir = preview.scratch_dir.unwrap_or_else(std::env::temp_dir);
    if scratch_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "preview.scratch_dir",
            "path must not be empty",
        ));
    }

    let jpeg_quality = preview.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
    if !(1..=100).contains(&jpeg_quality) {
        return Err(LoadError::invalid(
            "preview.jpeg_quality",
            "must be between 1 and 100",
        ));
    }

    Ok(PreviewSettings {
        scratch_dir,
        jpeg_quality,
    })
}

fn build_render_settings(render: RawRenderSettings) -> RenderSettings {
    RenderSettings {
        fallback_font: render
            .fallback_font
            .filter(|path| !path.as_os_str().is_empty()),
    }
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let limit = search.result_limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let result_limit = NonZeroU32::new(limit)
        .ok_or_else(|| LoadError::invalid("search.result_limit", "must be greater than zero"))?;
    Ok(SearchSettings { result_limit })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPathSettings {
    preferences_file: Option<PathBuf>,
    docker: Option<bool>,
    install_root: Option<PathBuf>,
    container_root: Option<PathBuf>,
    static_root: Option<PathBuf>,
    template_root: Option<PathBuf>,
    font_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPreviewSettings {
    scratch_dir: Option<PathBuf>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    fallback_font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    result_limit: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}
