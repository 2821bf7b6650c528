mod agents;
mod cli;
mod cloudflare;
mod config;
mod error;
mod model;
mod report;
mod utils;
mod wordpress;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use config::FleetConfig;
use std::process;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var(utils::console::VERBOSE_ENV, "1");
        }
    }

    let result = FleetConfig::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Update(args) => workflow::execute_update(&config, args),
        Commands::List {
            targets,
            report_dir,
            use_existing,
            dry_run,
        } => workflow::execute_list(&config, &targets, report_dir, use_existing, dry_run).map(|_| 0),
        Commands::Report { reports_dir } => workflow::execute_report(&reports_dir).map(|_| 0),
        Commands::Deploy {
            plugin_source,
            plugin_slug,
            sites,
            target_dir,
            dry_run,
        } => workflow::execute_deploy(
            &config,
            plugin_source,
            plugin_slug,
            sites.as_deref(),
            target_dir,
            dry_run,
        ),
        Commands::Urls { targets, json } => workflow::execute_urls(&config, &targets, json).map(|_| 0),
        Commands::Dns {
            zone,
            name,
            content,
            record_type,
            proxied,
            ttl,
            dry_run,
        } => workflow::execute_dns(
            &config,
            &zone,
            cloudflare::DnsRecordRequest {
                record_type,
                name,
                content,
                ttl,
                proxied,
            },
            dry_run,
        )
        .map(|_| 0),
        Commands::PruneBackups {
            dir,
            keep,
            prefix,
            dry_run,
        } => workflow::execute_prune_backups(&config, dir, keep, prefix.as_deref(), dry_run)
            .map(|_| 0),
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}
