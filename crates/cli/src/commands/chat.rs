//! `steward chat`: interactive or single-message chat mode.
//!
//! A reference host for the agent loop: renders Status lines as
//! transient progress, prompts approve/reject on Confirmation, prints
//! the Final reply split at a terminal-friendly size limit, and
//! re-supplies the trimmed conversation across turns.

use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use steward_agent::{AgentLoop, LoopEvent, RateLimiter};
use steward_config::AppConfig;
use steward_core::event::EventBus;
use steward_core::message::Conversation;
use steward_core::split_message;

/// Chunk size for printed replies.
const OUTPUT_CHAR_LIMIT: usize = 2000;

pub async fn run(message: Option<String>) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    STEWARD_API_KEY  (generic)");
        eprintln!("    GEMINI_API_KEY   (Gemini direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!(
            "    {}",
            AppConfig::config_dir().join("config.toml").display()
        );
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let provider = steward_providers::build_from_config(&config)?;
    let tools = Arc::new(steward_tools::default_registry());
    let limiter = Arc::new(RateLimiter::from_config(&config.cooldowns));
    let event_bus = Arc::new(EventBus::default());
    let agent = AgentLoop::new(provider, tools.clone(), limiter, event_bus, &config);

    if let Some(msg) = message {
        run_turn(&agent, &msg, None, &config).await?;
        return Ok(());
    }

    println!();
    println!("  Steward interactive mode");
    println!();
    println!("  Model:  {}", config.model);
    println!("  Tools:  {}", tools.names().join(", "));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history: Option<Conversation> = None;
    loop {
        let line = match prompt("  You > ").await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        let conversation = run_turn(&agent, line, history.take(), &config).await?;
        history = Some(conversation);
    }

    Ok(())
}

/// One full run: consume events to completion and hand back the
/// trimmed conversation for the next turn.
async fn run_turn(
    agent: &AgentLoop,
    message: &str,
    history: Option<Conversation>,
    config: &AppConfig,
) -> anyhow::Result<Conversation> {
    let mut run = agent.run(message, history);

    while let Some(event) = run.next_event().await {
        match event {
            LoopEvent::Status { text } => {
                eprintln!("  [{text}]");
            }
            LoopEvent::Confirmation(request) => {
                println!(
                    "  Approval needed: {} {}",
                    request.tool_name,
                    serde_json::Value::Object(request.arguments.clone())
                );
                let answer = prompt("  Approve? [y/N] ").await?.unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("y") {
                    request.approve();
                } else {
                    request.reject();
                }
            }
            LoopEvent::Final { text } => {
                println!();
                for chunk in split_message(&text, OUTPUT_CHAR_LIMIT) {
                    println!("{chunk}");
                }
                println!();
            }
        }
    }

    let mut conversation = run.conversation().await;
    conversation.trim_to(config.max_history_turns);
    Ok(conversation)
}

/// Print a prompt and read one line from stdin. `None` on EOF.
async fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(e) => Err(e),
        }
    })
    .await
    .context("stdin reader task failed")??;

    Ok(line)
}
