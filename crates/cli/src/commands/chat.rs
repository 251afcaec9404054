//! `learnloop chat`: Interactive or single-message tutoring.

use std::io::Write;
use std::sync::Arc;

use learnloop_agent::{Orchestrator, TurnResult, TutorRuntime};
use learnloop_config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(student_id: String, message: Option<String>, allow_search: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions when no key is configured
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!("    LEARNLOOP_API_KEY=...          (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    debug!(student = %student_id, provider = %config.default_provider, search = allow_search, "Starting chat");
    let runtime = Arc::new(TutorRuntime::from_config(&config)?);
    runtime.open_session(&student_id).await?;
    let mut tutor = Orchestrator::new(runtime.clone(), &student_id);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = tutor.process(&msg, allow_search, None).await;
        eprint!("\r              \r");
        print_turn(&result?, false);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          LearnLoop Tutor — Interactive        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Student:   {student_id}");
    println!("  Session:   {}", tutor.session_id());
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Search:    {}", if allow_search && config.search.enabled { "on" } else { "off" });
    println!();
    println!("  Type your question and press Enter.");
    println!("  '/summary' shows the session, '/reset' starts over, 'exit' quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "exit" | "quit" | "/exit" | "/quit" | ":q" => break,
            "/summary" => {
                let report = tutor.session_summary().await;
                println!();
                println!("  Session {} ({})", report.session_id, report.duration);
                println!("  Messages: {}  Level: {}  Progress: {}%", report.messages_count, report.level, report.progress);
                println!();
            }
            "/reset" => {
                let id = tutor.reset_session().clone();
                if let Err(e) = runtime.open_session(&student_id).await {
                    eprintln!("  [Error] {e}");
                }
                println!("\n  New session: {id}\n");
            }
            _ => {
                eprint!("  ...");
                match tutor.process(line, allow_search, None).await {
                    Ok(result) => {
                        eprint!("\r     \r");
                        print_turn(&result, true);
                    }
                    Err(e) => {
                        eprint!("\r     \r");
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

fn print_turn(result: &TurnResult, interactive: bool) {
    if !interactive {
        println!("{}", result.message);
        return;
    }

    println!();
    for line in result.message.lines() {
        println!("  Tutor > {line}");
    }
    let mut status = format!("  [{} · {}%", result.level, result.progress);
    if !result.topics_detected.is_empty() {
        status.push_str(&format!(" · {}", result.topics_detected.join(", ")));
    }
    if !result.tools_used.is_empty() {
        status.push_str(&format!(" · used {}", result.tools_used.join(", ")));
    }
    status.push(']');
    println!("{status}");
    println!();
}
