// src/main.rs
// =============================================================================
// This is the entry point of the flink-check CLI.
//
// What happens here:
// 1. Parse command-line arguments (and environment fallbacks) using clap
// 2. Set up logging
// 3. Load the link list; if that fails there is nothing to do
// 4. Run the pipeline, which also writes the report file
// 5. Print a summary table (or the report as JSON)
//
// Exit codes: 0 = report written, 2 = could not load the list or write the report
// =============================================================================

mod cli;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use cli::Cli;
use flink_check::report::{LinkStatus, Report};
use flink_check::{logger, run_check, source};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logger::init_logger(cli.log_level.into())?;

    let json = cli.json;
    let config = cli.into_config();

    info!("access whitelist: {:?}", config.access_whitelist);
    info!("backlink whitelist: {:?}", config.backlink_whitelist);
    match &config.proxy_template {
        Some(proxy) => info!("proxy configured ({})", proxy.split(':').next().unwrap_or("?")),
        None => info!("no proxy configured"),
    }
    match &config.author_url {
        Some(author) => info!("author URL: {}", author),
        None => info!("no author URL, link pages will not be checked"),
    }

    let entries = match source::load_entries(&config.source).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("{}", e);
            return Ok(2);
        }
    };

    let report = run_check(config, entries).await?;
    print_results(&report, json)?;

    Ok(0)
}

// Prints the report either as a table or JSON
fn print_results(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_table(report);
    }
    Ok(())
}

fn print_table(report: &Report) {
    println!(
        "{:<48} {:<11} {:>8} {:>6} {:>6}",
        "LINK", "LAYER", "LATENCY", "HTTP", "FAILS"
    );
    println!("{}", "=".repeat(83));

    for status in &report.link_status {
        println!(
            "{:<48} {:<11} {:>8} {:>6} {:>6}",
            truncate(&status.link, 48),
            status.check_layer,
            format_latency(status),
            status.raw_status_code,
            status.fail_count
        );
    }

    println!();
    println!("📊 Summary ({}):", report.timestamp);
    println!("   ✅ Accessible: {}", report.accessible_count);
    println!("   ❌ Inaccessible: {}", report.inaccessible_count);
    println!("   📋 Total: {}", report.total_count);
    if let Some(count) = report.has_author_link_count {
        println!("   🔗 With backlink: {}", count);
    }
}

fn format_latency(status: &LinkStatus) -> String {
    if status.is_accessible {
        format!("{:.2}s", status.latency)
    } else {
        "-".to_string()
    }
}

// Truncate on a char boundary; links may contain non-ASCII characters
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("https://a.example/", 48), "https://a.example/");
        assert_eq!(truncate("https://例子.example/very/long", 12), "https://例...");
    }
}
