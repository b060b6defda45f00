// ABOUTME: Entry point for calloop — inspection commands for the call grammar and window trimmers.
// ABOUTME: Parses CLI args, loads config, initializes tracing, and runs one subcommand.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use calloop::agent::{Agent, ExitSignal, ReplayClient};
use calloop::call::{ToolCallFingerprint, split_bundle, validate_call};
use calloop::config::Config;
use calloop::message::Message;
use calloop::prompt::InstructionBuilder;
use calloop::session::{MemorySink, RecordLogger, RecordSink};
use calloop::tools::{FinishTool, ToolFlags, ToolRegistry};
use calloop::window::{TrimStrategy, estimate_message_tokens, trim_window, trim_with_pairs};

#[derive(Parser)]
#[command(name = "calloop", about = "Tool-call dispatch and conversation window engine")]
struct Cli {
    /// Config file (defaults to ~/.calloop/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether text is a single call and show how it would be split.
    Check {
        /// Call text, or `-` to read stdin.
        text: String,
        /// Extra tool names to treat as bundleable.
        #[arg(short, long)]
        bundleable: Vec<String>,
    },
    /// Trim a JSON array of messages and print the result.
    Trim {
        file: PathBuf,
        #[arg(long)]
        max_messages: Option<usize>,
        #[arg(long)]
        max_tokens: Option<usize>,
        #[arg(long)]
        pinned: Option<usize>,
        /// Keep tool invocations and results together (needs a token cap).
        #[arg(long)]
        pairs: bool,
    },
    /// Print the duplicate-detection fingerprint of a call.
    Fingerprint { text: String },
    /// Run the agent loop against a JSON array of scripted replies.
    Replay {
        script: PathBuf,
        /// Opening human message.
        #[arg(short, long, default_value = "Replay the scripted conversation.")]
        task: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    init_tracing(&config.log.level);

    match cli.command {
        Command::Check { text, bundleable } => check(&config, &read_text(&text)?, &bundleable),
        Command::Trim {
            file,
            max_messages,
            max_tokens,
            pinned,
            pairs,
        } => {
            let messages = read_messages(&file)?;
            let max_messages = max_messages.unwrap_or(config.window.max_messages);
            let max_tokens = max_tokens.or(config.window.max_tokens);
            let pinned = pinned.unwrap_or(config.window.pinned_count).min(messages.len());
            let trimmed = if pairs {
                let cap = max_tokens.context("--pairs needs --max-tokens or window.max_tokens")?;
                trim_with_pairs(
                    &messages,
                    pinned,
                    cap,
                    TrimStrategy::KeepLast,
                    false,
                    estimate_message_tokens,
                )?
            } else {
                let (prefix, tail) = messages.split_at(pinned);
                trim_window(prefix, tail, max_messages, max_tokens, estimate_message_tokens)
            };
            println!("{}", serde_json::to_string_pretty(&trimmed)?);
            Ok(())
        }
        Command::Fingerprint { text } => {
            let fingerprint = ToolCallFingerprint::from_code(&read_text(&text)?)
                .context("not a single call expression")?;
            println!("{}", fingerprint.name);
            for (key, value) in &fingerprint.params {
                println!("  {} = {}", key, value);
            }
            Ok(())
        }
        Command::Replay { script, task } => replay(&config, &script, task).await,
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The argument itself, or stdin when it is `-`.
fn read_text(arg: &str) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_messages(path: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a message array", path.display()))
}

fn check(config: &Config, text: &str, extra_bundleable: &[String]) -> anyhow::Result<()> {
    let is_bundleable = |name: &str| {
        config.tools.bundleable.iter().any(|n| n == name)
            || extra_bundleable.iter().any(|n| n == name)
    };
    println!("valid: {}", validate_call(text));
    let calls = split_bundle(text, is_bundleable);
    println!("calls: {}", calls.len());
    for (i, call) in calls.iter().enumerate() {
        println!("[{}] {}", i, call);
    }
    Ok(())
}

async fn replay(config: &Config, script: &Path, task: String) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let replies: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of strings", script.display()))?;

    let exit = ExitSignal::new();
    let registry = ToolRegistry::new()
        .register(FinishTool::new(exit.clone()), ToolFlags::default())
        .apply_config(&config.tools);
    let records: Arc<dyn RecordSink> = match &config.log.records_dir {
        Some(dir) => Arc::new(RecordLogger::new_in_dir(dir)?),
        None => Arc::new(MemorySink::new()),
    };

    let instruction = InstructionBuilder::new()
        .load_overrides(&Config::config_dir())
        .load_local()
        .build(&registry.signatures());

    let client = Arc::new(ReplayClient::new(replies));
    let mut agent = Agent::new(client, Arc::new(registry), exit, config)
        .with_instruction(instruction)
        .with_records(records);
    let outcome = agent.run(vec![Message::human(task)]).await?;

    println!("{}", serde_json::to_string_pretty(&agent.transcript())?);
    println!("outcome: {:?} after {} iterations", outcome, agent.iterations());
    Ok(())
}
