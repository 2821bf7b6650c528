use crate::agents::backup::BackupFormat;
use crate::agents::update::UpdateMode;
use crate::report::ReportFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "wpfleet",
    about = "Operate a fleet of Dockerized WordPress sites: plugin updates, health checks, backups and DNS",
    version,
    author
)]
pub struct Cli {
    /// Path to a wpfleet.toml (defaults to ./wpfleet.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// How targets are discovered. Without --targets or --target-dir, running
/// containers are listed with `docker ps`.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Parent directory scanned for wp-config.php (up to three levels deep)
    #[arg(long, value_name = "DIR", conflicts_with = "targets")]
    pub target_dir: Option<PathBuf>,

    /// WordPress root relative to each site directory (e.g. "www")
    #[arg(long, value_name = "PATH")]
    pub subdir: Option<PathBuf>,

    /// Explicit site paths or container names, separated by ',' or '|'
    #[arg(long, value_name = "LIST")]
    pub targets: Option<String>,

    /// Container name prefix used when listing containers
    #[arg(long, value_name = "PREFIX")]
    pub container_prefix: Option<String>,

    /// Compose service label that marks WordPress containers
    #[arg(long, value_name = "SERVICE")]
    pub service_label: Option<String>,

    /// Containers or sites to leave out, separated by ','
    #[arg(long, value_name = "LIST")]
    pub exclude_containers: Option<String>,

    /// Run wp through each site's derived container instead of locally
    #[arg(long)]
    pub via_docker: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up, update plugins and health-check every target
    Update(UpdateArgs),

    /// Collect `wp plugin list` from each container and show distributions
    List {
        #[command(flatten)]
        targets: TargetArgs,

        /// Directory receiving <container>/plugin-list.json
        #[arg(long, value_name = "DIR")]
        report_dir: Option<PathBuf>,

        /// Load previously saved plugin lists instead of collecting
        #[arg(long)]
        use_existing: bool,

        /// Print the docker commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize saved plugin lists
    Report {
        /// Directory holding one subdirectory per container
        #[arg(short, long, value_name = "DIR")]
        reports_dir: PathBuf,
    },

    /// Copy a plugin into site containers and activate it
    Deploy {
        /// Plugin directory on this host
        #[arg(long, value_name = "DIR")]
        plugin_source: PathBuf,

        /// Slug passed to `wp plugin activate`
        #[arg(long)]
        plugin_slug: String,

        /// Site domains, separated by ','; containers are derived as <prefix><site without .com>
        #[arg(long, value_name = "LIST", conflicts_with = "target_dir")]
        sites: Option<String>,

        /// Parent directory scanned for sites instead of --sites
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Print each target's home URL
    Urls {
        #[command(flatten)]
        targets: TargetArgs,

        /// Emit JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Create or update a Cloudflare DNS record
    Dns {
        /// Zone name, e.g. example.com
        #[arg(long)]
        zone: String,

        /// Fully qualified record name
        #[arg(long)]
        name: String,

        /// Record content, e.g. an IPv4 address
        #[arg(long)]
        content: String,

        #[arg(long = "type", default_value = "A")]
        record_type: String,

        #[arg(long)]
        proxied: bool,

        /// TTL in seconds; 1 means automatic
        #[arg(long, default_value_t = 1)]
        ttl: u32,

        /// Look up the zone and record but do not write
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete old plugin backups, keeping the newest per site
    PruneBackups {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Backups to keep per site
        #[arg(long, default_value_t = 5)]
        keep: usize,

        /// Only prune backups of this site slug
        #[arg(long)]
        prefix: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub skip_backup: bool,

    /// Skip the plugin inventory, update check and updates
    #[arg(long)]
    pub skip_plugins: bool,

    #[arg(long)]
    pub skip_wp_doctor: bool,

    /// Doctor checks to skip, separated by ','; "none" skips nothing
    #[arg(long, value_name = "LIST")]
    pub exclude_checks: Option<String>,

    /// Run only these doctor checks instead of `wp doctor list`
    #[arg(long, value_name = "LIST")]
    pub checks: Option<String>,

    #[arg(long, value_enum, default_value_t = UpdateMode::Individual)]
    pub update_mode: UpdateMode,

    /// Plugins for --update-mode priority, in order
    #[arg(long, value_name = "LIST")]
    pub priority_plugins: Option<String>,

    #[arg(long, value_enum, default_value_t = BackupFormat::Copy)]
    pub backup_format: BackupFormat,

    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Where status files and the run report go
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Write update-results.<md|html> and print it
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = "md"
    )]
    pub print_results: Option<ReportFormat>,

    /// Seconds before the reachability check gives up
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,

    /// Targets processed in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Exit 0 even when health checks report errors
    #[arg(long)]
    pub ignore_check_errors: bool,

    /// Answer yes to the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
