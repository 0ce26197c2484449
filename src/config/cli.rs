use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the tcm-webui binary.
#[derive(Debug, Parser)]
#[command(
    name = "tcm-webui",
    version,
    about = "Title card series configuration editor and preview server"
)]
pub struct CliArgs {
    /// Optional path to a settings file for the web service itself.
    #[arg(long = "config-file", env = "TCM_WEBUI_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Override the preferences file location.
    #[arg(long = "preferences", env = "TCM_PREFERENCES", value_name = "PATH")]
    pub preferences: Option<PathBuf>,

    /// Whether the service runs inside the container image.
    #[arg(
        long = "docker",
        env = "TCM_IS_DOCKER",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub is_docker: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Print the candidate series configuration files in priority order.
    #[command(name = "files")]
    Files,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the directory static assets are served from.
    #[arg(long = "static-root", value_name = "PATH")]
    pub static_root: Option<PathBuf>,

    /// Override the directory holding the UI entry document.
    #[arg(long = "template-root", value_name = "PATH")]
    pub template_root: Option<PathBuf>,

    /// Override the default directory offered by the font browser.
    #[arg(long = "font-directory", value_name = "PATH")]
    pub font_directory: Option<PathBuf>,

    /// Override the directory preview scratch areas are created under.
    #[arg(long = "preview-scratch-dir", value_name = "PATH")]
    pub preview_scratch_dir: Option<PathBuf>,
}
