//! medassist CLI: run the assistants against the local inference server and
//! inspect the cost ledger.
//!
//! Usage:
//!   medassist-cli chat <message>                        General health chat
//!   medassist-cli medical <message> [--history <text>]  Medical consultation
//!   medassist-cli minutes <transcript-file>             Meeting minutes from text
//!   medassist-cli transcribe <audio-file>               Speech to text
//!   medassist-cli minutes-audio <audio-file>            Meeting minutes from a recording
//!   medassist-cli estimate <text> [--model <id>]        Token and cost estimate, no backend call
//!   medassist-cli ledger [show|reset]                   Cumulative cost ledger

use anyhow::{bail, Context};
use medassist::stt::SttOptions;
use medassist::tokens::{TokenEstimator, TokenUsage};
use medassist::{ModelId, ResponseGenerator, Settings};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rest = &args[2..];
    let outcome = match args[1].as_str() {
        "chat" => cmd_chat(rest).await,
        "medical" => cmd_medical(rest).await,
        "minutes" => cmd_minutes(rest).await,
        "transcribe" => cmd_transcribe(rest).await,
        "minutes-audio" => cmd_minutes_audio(rest).await,
        "estimate" => cmd_estimate(rest),
        "ledger" => cmd_ledger(rest).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"medassist-cli — local healthcare assistant with cost accounting

USAGE:
    medassist-cli <COMMAND> [OPTIONS]

COMMANDS:
    chat <message>                        General health chat
    medical <message> [--history <text>]  Medical consultation with patient history
    minutes <transcript-file>             Meeting minutes from a transcript file
    transcribe <audio-file>               Transcribe a recording
    minutes-audio <audio-file>            Meeting minutes from a recording
    estimate <text> [--model <id>]        Estimate tokens and cost without a backend call
    ledger [show|reset]                   Show or reset the cumulative cost ledger
    version                               Show version information
    help                                  Show this help message

ENVIRONMENT:
    MEDASSIST_BASE_URL                    Inference server (default http://localhost:8553/v1/openai)
    MEDASSIST_MODEL                       Local chat model (default qwen2.5)
    MEDASSIST_LEDGER_PATH                 Ledger file (default cost_log.json)
    MEDASSIST_RATE_FILE                   Optional YAML rate table
    RUST_LOG                              Log filter (default info)"#
    );
}

fn cmd_version() {
    println!("medassist-cli {}", env!("CARGO_PKG_VERSION"));
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Value following `--name`, if present.
fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Positional arguments with `--flag value` pairs removed.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn generator() -> anyhow::Result<(Settings, ResponseGenerator)> {
    let settings = Settings::from_env().context("loading settings")?;
    let generator = ResponseGenerator::from_settings(&settings)?;
    Ok((settings, generator))
}

fn read_audio(path: &str) -> anyhow::Result<(Vec<u8>, SttOptions)> {
    let audio = std::fs::read(path).with_context(|| format!("reading {path}"))?;
    let mut options = SttOptions::default();
    if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
        options = options.file_name(name);
    }
    Ok((audio, options))
}

async fn cmd_chat(args: &[String]) -> anyhow::Result<()> {
    let message = positional(args).join(" ");
    let (_, generator) = generator()?;
    print_json(&generator.chat(&message).await?)
}

async fn cmd_medical(args: &[String]) -> anyhow::Result<()> {
    let message = positional(args).join(" ");
    let history = flag_value(args, "--history").unwrap_or("");
    let (_, generator) = generator()?;
    print_json(&generator.medical_consult(&message, history).await?)
}

async fn cmd_minutes(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = positional(args).first().copied() else {
        bail!("minutes requires a transcript file");
    };
    let transcript =
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let (_, generator) = generator()?;
    print_json(&generator.meeting_minutes(&transcript).await?)
}

async fn cmd_transcribe(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = positional(args).first().copied() else {
        bail!("transcribe requires an audio file");
    };
    let (audio, options) = read_audio(path)?;
    let settings = Settings::from_env().context("loading settings")?;
    let stt = settings.stt_client()?;
    print_json(&stt.transcribe(&audio, &options).await?)
}

async fn cmd_minutes_audio(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = positional(args).first().copied() else {
        bail!("minutes-audio requires an audio file");
    };
    let (audio, options) = read_audio(path)?;
    let (settings, generator) = generator()?;
    let stt = settings.stt_client()?;
    print_json(
        &generator
            .meeting_minutes_from_audio(&stt, &audio, &options)
            .await?,
    )
}

#[derive(Serialize)]
struct Estimate {
    model: String,
    token_usage: TokenUsage,
    cost_data: medassist::tokens::CostBreakdown,
    commercial_costs: std::collections::BTreeMap<String, medassist::tokens::CommercialCost>,
}

fn cmd_estimate(args: &[String]) -> anyhow::Result<()> {
    let text = positional(args).join(" ");
    let settings = Settings::from_env().context("loading settings")?;
    let model = flag_value(args, "--model")
        .map(ModelId::new)
        .unwrap_or_else(|| settings.model.clone());

    let usage = TokenUsage::new(TokenEstimator::new().estimate(&text, &model), 0);
    let estimate = Estimate {
        model: model.to_string(),
        token_usage: usage,
        cost_data: settings.rates.calculate_cost(&model, usage.input_tokens, 0, None),
        commercial_costs: settings
            .commercial_models
            .iter()
            .map(|m| {
                (
                    m.to_string(),
                    settings.commercial_rates.calculate(usage.total_tokens, m),
                )
            })
            .collect(),
    };
    print_json(&estimate)
}

async fn cmd_ledger(args: &[String]) -> anyhow::Result<()> {
    let settings = Settings::from_env().context("loading settings")?;
    let ledger = settings.ledger();
    match args.first().map(String::as_str).unwrap_or("show") {
        "show" => print_json(&ledger.load().await),
        "reset" => print_json(&ledger.reset().await),
        other => bail!("unknown ledger action: {other} (expected show or reset)"),
    }
}
