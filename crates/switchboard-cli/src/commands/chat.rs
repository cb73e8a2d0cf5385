use clap::Args;
use futures::StreamExt;
use std::io::Write;
use tokio::io::AsyncBufReadExt;
use tracing::debug;

use switchboard_config::GatewayConfig;
use switchboard_core::{ChatMessage, Result, Role};
use switchboard_llm::{ChatSession, ProviderRouter};

use super::build_router;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model to request
    #[arg(short, long, env = "SWITCHBOARD_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// System prompt prepended to the conversation
    #[arg(long)]
    pub system: Option<String>,

    /// Print raw `data:` events instead of plain text
    #[arg(long)]
    pub sse: bool,

    /// Prompt text; omit for an interactive session
    pub prompt: Vec<String>,
}

pub(super) async fn cmd_chat(config: GatewayConfig, args: ChatArgs) -> Result<()> {
    let router = build_router(&config);
    debug!(model = %args.model, providers = router.registry().len(), "starting chat");
    if args.prompt.is_empty() {
        return interactive(router, args).await;
    }

    let messages = initial_history(args.system.as_deref(), args.prompt.join(" "));
    let session = ChatSession::new(router, args.model, messages)?;
    if args.sse {
        let mut events = session.into_sse();
        while let Some(event) = events.next().await {
            print!("{event}");
            std::io::stdout().flush().ok();
        }
        return Ok(());
    }
    stream_to_stdout(session).await.map(|_| ())
}

async fn interactive(router: ProviderRouter, args: ChatArgs) -> Result<()> {
    println!("Switchboard Interactive Chat ({})", args.model);
    println!("   Type 'exit' or Ctrl+C to quit");
    println!("   Type '/reset' to clear the conversation");
    println!("   Type '/providers' for provider health");
    println!();

    let mut history: Vec<ChatMessage> = args.system.iter().map(ChatMessage::system).collect();

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let mut lines = reader.lines();

    loop {
        eprint!("\x1b[36myou>\x1b[0m ");
        std::io::stderr().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed {
            "exit" | "quit" | "/exit" => {
                println!("👋 Goodbye!");
                break;
            }
            "/reset" => {
                history.retain(|m| m.role == Role::System);
                println!("   conversation cleared");
                continue;
            }
            "/providers" => {
                for s in router.registry().statuses() {
                    let mark = if s.healthy { "✓" } else { "✗" };
                    println!("   {mark} {} ({} failures)", s.name, s.consecutive_failures);
                }
                continue;
            }
            _ => {}
        }

        history.push(ChatMessage::user(trimmed));
        let session = ChatSession::new(router.clone(), args.model.clone(), history.clone())?;
        match stream_to_stdout(session).await {
            Ok(reply) => history.push(ChatMessage::assistant(reply)),
            Err(e) => {
                println!("\x1b[31m❌ {e}\x1b[0m");
                // Keep history to turns that got an answer
                history.pop();
            }
        }
        println!();
    }

    Ok(())
}

/// Print fragments as they arrive and return the full reply.
async fn stream_to_stdout(session: ChatSession) -> Result<String> {
    let mut stream = session.stream();
    let mut reply = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => {
                print!("{text}");
                std::io::stdout().flush().ok();
                reply.push_str(&text);
            }
            Err(e) => {
                if !reply.is_empty() {
                    println!();
                }
                return Err(e);
            }
        }
    }
    println!();
    Ok(reply)
}

fn initial_history(system: Option<&str>, prompt: String) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = system.map(ChatMessage::system).into_iter().collect();
    messages.push(ChatMessage::user(prompt));
    messages
}
