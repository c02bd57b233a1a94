use crate::k8s::kube_config::ConfigOverrides;
use crate::server::DEFAULT_HTTP_PORT;
use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CONFIG_MAP: &str = "appctl-cm";

/// Run the appctl API server
#[derive(Parser, Debug)]
#[command(name = "appctl-server", about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, args_override_self = true)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version information
    Version(VersionArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct VersionArgs {
    /// Print just the version number
    #[arg(long)]
    pub short: bool,

    /// Print the version information as JSON
    #[arg(long)]
    pub json: bool,
}

/// Flags of the server command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    /// Set the logging level. One of: debug|info|warn|error
    #[arg(long = "loglevel", default_value = "info")]
    pub log_level: String,

    /// Kubernetes config (used when running outside of cluster)
    #[arg(long, default_value = "")]
    pub kubeconfig: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Name of K8s configmap to retrieve the server configuration
    #[arg(long = "configmap", default_value = DEFAULT_CONFIG_MAP)]
    pub config_map: String,

    /// Static assets directory path
    #[arg(long = "staticassets", default_value = "")]
    pub static_assets_dir: String,

    /// Port to listen on
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            kubeconfig: String::new(),
            overrides: ConfigOverrides::default(),
            config_map: DEFAULT_CONFIG_MAP.to_string(),
            static_assets_dir: String::new(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}
