//! Offline cache commands

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Method, Url};
use serde::Serialize;
use std::time::Duration;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::error::{Error, Result};
use crate::offline::{ActivationReport, InstallReport, Request, ResponseSource};
use crate::output::display::EntryRow;
use crate::output::formatters::format_size;
use crate::output::{format_table, print_json};

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_activation(report: &ActivationReport) {
    println!("{} Activated", "✓".green());
    for name in &report.deleted {
        println!("  Deleted old cache: {}", name);
    }
}

fn print_install(report: &InstallReport) {
    println!(
        "{} Installed {} ({} stored, {} failed)",
        "✓".green(),
        report.snapshot.bold(),
        report.stored.len(),
        report.failed.len()
    );
    for path in &report.failed {
        println!("  {} {}", "✗".red(), path);
    }
    match report.activation {
        Some(ref activation) => print_activation(activation),
        None => println!("Waiting. Run `offtask cache activate` to take over."),
    }
}

/// Install the current version into its snapshot
pub async fn install(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let controller = ctx.controller()?;

    let bar = (ctx.format != OutputFormat::Json)
        .then(|| spinner(&format!("Installing {}...", controller.version())));
    let result = controller.install().await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let report = result?;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => print_install(&report),
    }
    Ok(())
}

/// Activate an installed version
pub async fn activate(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let controller = ctx.controller()?;

    if !controller.resume().await? {
        return Err(Error::Invalid(format!(
            "{} is not installed; run `offtask cache install` first",
            controller.version()
        )));
    }
    let report = controller.activate().await?;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => print_activation(&report),
    }
    Ok(())
}

/// Post a control message to a freshly resumed controller
pub async fn message(opts: &GlobalOptions, json: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let controller = ctx.controller()?;
    controller.resume().await?;

    let activation = controller.post_message(json).await?;
    let state = controller.state().await;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "state": state.to_string(),
            "activation": activation,
        }))?,
        _ => match activation {
            Some(ref report) => print_activation(report),
            None => println!("Message handled; controller is {}", state),
        },
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct FetchOutput {
    url: String,
    status: u16,
    source: ResponseSource,
    headers: Vec<(String, String)>,
    /// Base64-encoded body
    body: String,
}

/// Resolve a CLI fetch target against the origin
fn resolve_target(origin: &Url, target: &str) -> Result<Url> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(_) => origin
            .join(target)
            .map_err(|e| Error::Invalid(format!("bad target '{}': {}", target, e))),
    }
}

/// Fetch through the controller, installing and activating first if needed
pub async fn fetch(
    opts: &GlobalOptions,
    target: &str,
    html: bool,
    method: &str,
    quiet: bool,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let url = resolve_target(&ctx.config.origin_url()?, target)?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Invalid(format!("bad HTTP method '{}'", method)))?;
    let request = if html {
        Request::navigate(url)
    } else {
        Request::get(url)
    }
    .with_method(method);

    let controller = ctx.controller()?;
    if let Some(report) = controller.ensure_active().await? {
        log::info!(
            "Installed {} before fetching ({} stored, {} failed)",
            report.snapshot,
            report.stored.len(),
            report.failed.len()
        );
    }

    let served = controller.handle_fetch(&request).await?;
    let response = served.response;

    match ctx.format {
        OutputFormat::Json => print_json(&FetchOutput {
            url: request.url.to_string(),
            status: response.status,
            source: served.source,
            headers: response.headers.clone(),
            body: STANDARD.encode(&response.body),
        })?,
        _ => {
            let status = if response.is_cacheable() {
                response.status.to_string().green()
            } else {
                response.status.to_string().yellow()
            };
            eprintln!(
                "{} {} {} (from {})",
                status,
                request.method,
                request.url,
                served.source
            );
            if let Some(content_type) = response.header("content-type") {
                eprintln!("{}", content_type.dimmed());
            }
            if !quiet {
                println!("{}", String::from_utf8_lossy(&response.body));
            }
        }
    }

    // Let the background refresh land before the process exits
    if let Some(revalidation) = served.revalidation
        && let Err(e) = revalidation.await
    {
        log::warn!("Background refresh did not finish: {}", e);
    }
    Ok(())
}

/// Show snapshot storage status
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.snapshot_store()?;
    let stats = store.stats()?;
    let snapshots = store.keys()?;
    let current = &ctx.config.cache.version;
    let installed = snapshots.iter().any(|name| name == current);

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "version": current,
            "installed": installed,
            "snapshots": snapshots,
            "entries": stats.entries,
            "total_size_bytes": stats.total_size_bytes,
            "total_size_human": format_size(stats.total_size_bytes),
            "path": store.db_path().display().to_string(),
        }))?,
        _ => {
            println!("Offline Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", store.db_path().display());
            println!("Origin:         {}", ctx.config.origin);
            println!(
                "Version:        {} ({})",
                current.bold(),
                if installed {
                    "installed".green()
                } else {
                    "not installed".yellow()
                }
            );
            println!("Snapshots:      {}", stats.snapshots);
            println!("Entries:        {}", stats.entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));
            for name in snapshots.iter().filter(|name| *name != current) {
                println!("  stale: {}", name);
            }
        }
    }

    Ok(())
}

/// List the entries of one snapshot
pub fn snapshots(opts: &GlobalOptions, name: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.snapshot_store()?;
    let name = name.unwrap_or(ctx.config.cache.version.as_str());
    let entries = store.entries(name)?;

    match ctx.format {
        OutputFormat::Json => print_json(&entries)?,
        _ => {
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            println!(
                "{}",
                format_table(&rows, &format!("Snapshot {} is empty.", name))
            );
        }
    }
    Ok(())
}

/// Delete all snapshots
pub fn clear(opts: &GlobalOptions, yes: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete all cached snapshots?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let stats = ctx.snapshot_store()?.clear_all()?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "snapshots_removed": stats.snapshots_removed,
            "entries_removed": stats.entries_removed,
        }))?,
        _ => {
            if stats.snapshots_removed > 0 {
                println!(
                    "Cleared {} snapshots ({} entries)",
                    stats.snapshots_removed, stats.entries_removed
                );
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Print the data directory
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    println!("{}", ctx.config.data_dir()?.display());
    Ok(())
}
