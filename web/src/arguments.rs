use clap::Parser;

/// Command line options for the admin backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "vsctl_web", about, version, long_about = None)]
pub struct WebArguments {
    #[arg(short = 'b', long = "bind", default_value = "0.0.0.0", help = "Address to bind the HTTP server to")]
    pub(crate) bind: String,

    #[arg(short = 'p', long = "port", default_value_t = 6680, help = "Port to serve the REST API on")]
    pub(crate) port: u16,

    #[arg(short = 'r', long = "registry", default_value = "./virtual-servers.json", help = "Path to the registry file")]
    pub(crate) registry_path: String,

    #[arg(short = 'o', long = "render-dir", default_value = "./rendered", help = "Directory where generated configuration files are written")]
    pub(crate) render_dir: String,

    #[arg(short = 's', long = "balancer-socket", help = "Local socket of the balancer control channel; omit to run standalone")]
    pub(crate) balancer_socket: Option<String>,

    #[arg(long = "control-timeout", default_value_t = 10, help = "Deadline in seconds for balancer control calls")]
    pub(crate) control_timeout: u64,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub(crate) verbose: bool,
}
