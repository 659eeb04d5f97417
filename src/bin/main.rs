use clap::Parser;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "eoka-harvest")]
#[command(about = "Harvest item details from infinite-scroll pages")]
#[command(version)]
struct Cli {
    /// Harvest file to run
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Write the harvested items as JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

/// The harvest result wins over a failure to close the browser.
fn keep_outcome<T>(
    outcome: eoka_harvest::Result<T>,
    closed: eoka_harvest::Result<()>,
) -> eoka_harvest::Result<T> {
    if let Err(e) = closed {
        warn!("Failed to close browser: {}", e);
    }
    outcome
}

#[tokio::main]
async fn main() -> eoka_harvest::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    // Logs go to stderr so stdout stays clean JSON.
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = eoka_harvest::Params::from_args(&cli.params)?;
    let mut config = eoka_harvest::Config::load_with_params(&cli.config, &params)?;

    if cli.check {
        let h = &config.harvest;
        println!("Config valid: {}", config.name);
        println!("  Target: {}", config.target.url);
        println!("  Items: {} (identity: {})", h.item_selector, h.identity_attribute);
        println!("  Response pattern: {}", h.response_pattern);
        println!("  Dismiss: {}", h.dismiss_selector);
        println!("  Step: {}px, settle {}ms", h.step_px, h.settle_ms);
        println!("  Cursor: {:?}", h.cursor);
        if !config.params.is_empty() {
            println!("  Parameters: {}", config.params.len());
            for (name, def) in &config.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }

    eprintln!("Harvesting: {}", config.name);

    let runner = eoka_harvest::Runner::new(&config.browser).await?;
    let outcome = runner.run(&config).await;
    // The browser is released even when the harvest could not start.
    let report = keep_outcome(outcome, runner.close().await)?;

    eprintln!();
    eprintln!("✓ Processed {} items", report.processed());
    if report.failed() > 0 {
        eprintln!("  Failed: {}", report.failed());
    }
    eprintln!("  Steps: {}", report.steps);
    eprintln!("  Duration: {}ms", report.duration_ms);

    let json = serde_json::to_string_pretty(&report.into_payloads())?;
    match cli.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            eprintln!("  Saved to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
