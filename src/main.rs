//! httprec CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use httprec::config::Config;
use httprec::storage::{sibling_file, Outcome, Scenario, SCENARIO_EXTENSION};
use httprec::Recorder;
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("httprec v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: httprec <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add <scenario> -u <url> [-c <config>]   Record <url> into <scenario>.json");
    eprintln!("  show <scenario> [-c <config>]           List recorded sequences");
    eprintln!();
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
    process::exit(1);
}

struct Args {
    command: String,
    scenario: PathBuf,
    url: Option<String>,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let command = args.next().unwrap_or_else(|| usage());
    let mut scenario = None;
    let mut url = None;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-u" | "--url" => url = Some(args.next().context("missing value for --url")?),
            "-c" | "--config" => {
                config = Some(PathBuf::from(
                    args.next().context("missing value for --config")?,
                ));
            }
            "-h" | "--help" => usage(),
            _ if arg.starts_with('-') => bail!("unknown option: {arg}"),
            _ if scenario.is_none() => scenario = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {arg}"),
        }
    }

    Ok(Args {
        command,
        scenario: scenario.context("missing <scenario>")?,
        url,
        config,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let scenario = config.fixtures_dir.join(&args.scenario);

    match args.command.as_str() {
        "add" => {
            let url = args.url.context("add requires -u <url>")?;
            let report = Recorder::from_config(&config.recorder)
                .record(&url, &scenario)
                .await
                .with_context(|| format!("cannot record {url}"))?;

            println!(
                "Recorded sequence {} ({} hops) into {}",
                report.sequence_ordinal,
                report.hops,
                report.scenario_file.display()
            );
            if report.truncated() {
                println!("Warning: stopped after {} redirects", report.hops);
            }
        }
        "show" => show(&scenario)?,
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run 'httprec' for usage information.");
            process::exit(1);
        }
    }

    Ok(())
}

fn show(name: &Path) -> anyhow::Result<()> {
    let path = sibling_file(name, SCENARIO_EXTENSION);
    let scenario = Scenario::load(&path)?;

    println!("Scenario: {}", path.display());
    println!("Sequences: {}", scenario.count());
    for (i, sequence) in scenario.sequences.iter().enumerate() {
        println!();
        println!("#{}", i + 1);
        for step in &sequence.steps {
            match &step.outcome {
                Outcome::Response(response) => println!(
                    "  {} {} -> {}{}",
                    step.method,
                    step.request_url,
                    response.status,
                    response
                        .body_filename
                        .as_deref()
                        .map(|f| format!(" [{f}]"))
                        .unwrap_or_default()
                ),
                Outcome::Error(error) => {
                    println!("  {} {} -> error: {error}", step.method, step.request_url);
                }
            }
        }
    }

    Ok(())
}
