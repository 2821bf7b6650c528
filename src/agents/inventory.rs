use crate::error::{FleetError, Result};
use crate::utils::console;
use crate::wordpress::cli::{FlagOrText, InstalledPlugin, parse_json_payload};
use crate::wordpress::WpCli;
use colored::{Color, Colorize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const PLUGIN_LIST_FILE: &str = "plugin-list.json";
const BAR_WIDTH: usize = 40;

/// Installed plugins of one container, as reported by `wp plugin list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInventory {
    pub container: String,
    pub plugins: Vec<InstalledPlugin>,
}

/// Runs `wp plugin list --format=json` and saves the payload under
/// `<reports_dir>/<container>/plugin-list.json`.
pub fn collect(wp: &WpCli, reports_dir: &Path, container: &str) -> Result<ContainerInventory> {
    let (raw, plugins) = wp.plugin_list()?;
    let dir = reports_dir.join(container);
    fs::create_dir_all(&dir)?;
    let payload = raw.find(['[', '{']).map(|i| &raw[i..]).unwrap_or("[]");
    fs::write(dir.join(PLUGIN_LIST_FILE), payload.trim())?;
    Ok(ContainerInventory {
        container: container.to_string(),
        plugins,
    })
}

pub fn load_saved(reports_dir: &Path, container: &str) -> Result<ContainerInventory> {
    let path = reports_dir.join(container).join(PLUGIN_LIST_FILE);
    let content = fs::read_to_string(&path)?;
    let plugins = parse_json_payload(&content)?.unwrap_or_default();
    Ok(ContainerInventory {
        container: container.to_string(),
        plugins,
    })
}

/// Subdirectories that hold saved plugin lists, and those that do not.
#[derive(Debug, Default)]
pub struct ReportScan {
    pub inventories: Vec<ContainerInventory>,
    pub missing: Vec<String>,
}

/// Scans each subdirectory of `reports_dir`, in name order.
pub fn scan_reports_dir(reports_dir: &Path) -> Result<ReportScan> {
    if !reports_dir.is_dir() {
        return Err(FleetError::Precondition(format!(
            "reports directory '{}' does not exist",
            reports_dir.display()
        )));
    }

    let mut names: Vec<String> = fs::read_dir(reports_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut scan = ReportScan::default();
    for name in names {
        if !reports_dir.join(&name).join(PLUGIN_LIST_FILE).is_file() {
            scan.missing.push(name);
            continue;
        }
        match load_saved(reports_dir, &name) {
            Ok(inventory) => scan.inventories.push(inventory),
            Err(e) => {
                console::warn(format!("skipping {name}: {e}"));
                scan.missing.push(name);
            }
        }
    }
    Ok(scan)
}

/// Counts over a fixed set of buckets; anything else lands in `other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub title: &'static str,
    pub buckets: Vec<(&'static str, usize)>,
    pub other: BTreeMap<String, usize>,
}

impl Distribution {
    fn new(title: &'static str, labels: &[&'static str]) -> Self {
        Self {
            title,
            buckets: labels.iter().map(|l| (*l, 0)).collect(),
            other: BTreeMap::new(),
        }
    }

    fn add(&mut self, value: Option<String>) {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return;
        };
        match self.buckets.iter_mut().find(|(label, _)| *label == value) {
            Some((_, count)) => *count += 1,
            None => *self.other.entry(value).or_insert(0) += 1,
        }
    }

    pub fn count(&self, label: &str) -> usize {
        self.buckets
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn other_total(&self) -> usize {
        self.other.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryStats {
    pub per_container: Vec<(String, usize)>,
    pub unique_plugins: usize,
    pub status: Distribution,
    pub update: Distribution,
    pub auto_update: Distribution,
}

impl InventoryStats {
    pub fn from_inventories(inventories: &[ContainerInventory]) -> Self {
        let mut status = Distribution::new(
            "Plugin status",
            &["active", "inactive", "must-use", "active-network", "dropin"],
        );
        let mut update = Distribution::new("Update status", &["none", "available", "unavailable"]);
        let mut auto_update = Distribution::new("Auto-update", &["on", "off"]);
        let mut unique = BTreeSet::new();

        for inventory in inventories {
            for plugin in &inventory.plugins {
                unique.insert(plugin.name.as_str());
                status.add(Some(plugin.status.trim().to_string()));
                update.add(flag_label(plugin.update.as_ref(), "available", "none"));
                auto_update.add(flag_label(plugin.auto_update.as_ref(), "on", "off"));
            }
        }

        Self {
            per_container: inventories
                .iter()
                .map(|i| (i.container.clone(), i.plugins.len()))
                .collect(),
            unique_plugins: unique.len(),
            status,
            update,
            auto_update,
        }
    }
}

fn flag_label(value: Option<&FlagOrText>, yes: &str, no: &str) -> Option<String> {
    match value? {
        FlagOrText::Flag(true) => Some(yes.to_string()),
        FlagOrText::Flag(false) => Some(no.to_string()),
        FlagOrText::Text(text) => Some(text.trim().to_string()),
    }
}

pub fn print_stats(stats: &InventoryStats) {
    println!("Found {} containers", stats.per_container.len());
    println!(
        "Total unique plugins across all containers: {}\n",
        stats.unique_plugins
    );

    println!("{}", "Plugins per container".bold());
    let widest = stats.per_container.iter().map(|(_, n)| *n).max().unwrap_or(0);
    for (container, count) in &stats.per_container {
        println!(
            "  {:<24} {} {}",
            container,
            bar(*count, widest).blue(),
            count
        );
    }
    println!();

    for dist in [&stats.status, &stats.update, &stats.auto_update] {
        print_distribution(dist);
    }
}

fn print_distribution(dist: &Distribution) {
    println!("{}", dist.title.bold());
    let total: usize = dist.buckets.iter().map(|(_, c)| *c).sum::<usize>() + dist.other_total();
    if total == 0 {
        println!("  {}\n", "no data".dimmed());
        return;
    }
    for (label, count) in dist.buckets.iter().filter(|(_, c)| *c > 0) {
        println!(
            "  {:<16} {} {}",
            label,
            bar(*count, total).color(bucket_colour(label)),
            count
        );
    }
    for (label, count) in &dist.other {
        println!("  {:<16} {} {}", label, bar(*count, total).dimmed(), count);
    }
    if dist.other_total() > 0 {
        console::warn(format!(
            "{}: {} value(s) outside the known set were counted as other",
            dist.title,
            dist.other_total()
        ));
    }
    println!();
}

fn bucket_colour(label: &str) -> Color {
    match label {
        "active" | "none" | "on" => Color::Green,
        "inactive" | "available" | "off" => Color::Red,
        "must-use" => Color::BrightGreen,
        "active-network" => Color::Cyan,
        "dropin" => Color::Magenta,
        "unavailable" => Color::Yellow,
        _ => Color::Blue,
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max).max(1);
    "█".repeat(len)
}
