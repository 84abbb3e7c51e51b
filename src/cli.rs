use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kwirth-tail")]
#[command(about = "Stream Kubernetes pod logs of a catalog entity through a Kwirth backend")]
pub struct Cli {
    /// Base URL of the Kwirth backend plugin (falls back to KWIRTH_BACKEND_URL)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Entity descriptor file (catalog-info.yaml or JSON)
    #[arg(short = 'e', long, conflicts_with = "entity_name")]
    pub entity: Option<PathBuf>,

    /// Entity reference as kind:namespace/name (e.g. component:default/shop)
    #[arg(long)]
    pub entity_name: Option<String>,

    /// Cluster to stream from (defaults to the only one available)
    #[arg(long)]
    pub cluster: Option<String>,

    /// Namespaces to include (comma-separated, defaults to all)
    #[arg(short = 'n', long, value_delimiter = ',')]
    pub namespace: Vec<String>,

    /// Pods to include (comma-separated, defaults to all in the namespaces)
    #[arg(short = 'p', long, value_delimiter = ',')]
    pub pod: Vec<String>,

    /// Containers to include (comma-separated, defaults to whole pods)
    #[arg(short = 'c', long, value_delimiter = ',')]
    pub container: Vec<String>,

    /// Ask the backend to prefix lines with timestamps
    #[arg(long)]
    pub timestamps: bool,

    /// Stream from container start instead of from now
    #[arg(long)]
    pub from_start: bool,

    /// Do not keep the view scrolled to the newest line
    #[arg(long)]
    pub no_follow: bool,

    /// Lines kept in the visible buffer
    #[arg(long, default_value_t = crate::types::LOG_MAX_MESSAGES)]
    pub max_messages: usize,

    /// Restart the selected pods once the stream is established
    #[arg(long)]
    pub restart: bool,

    /// List clusters and pods for the entity and exit
    #[arg(long)]
    pub list: bool,

    /// Disable TUI and print to stdout
    #[arg(long)]
    pub no_tui: bool,

    /// Directory downloads are written to
    #[arg(long, default_value = ".")]
    pub download_dir: PathBuf,

    /// Timeout for backend HTTP requests, in seconds
    #[arg(long, default_value_t = 20)]
    pub http_timeout_secs: u64,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
