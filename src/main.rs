// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! mcpsh entry point - serve and chat commands.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use mcpsh::agent::{Agent, AgentConfig};
use mcpsh::config::{McpConfig, DEFAULT_CONFIG_FILE};
use mcpsh::mcp::{ClientSet, SseClient, ToolDispatcher};
use mcpsh::providers::OpenAIProvider;
use mcpsh::server;

/// Shell tools for LLM tool calling over MCP.
///
/// Without a subcommand the binary runs the chat loop against the
/// configured MCP servers.
#[derive(Parser)]
#[command(name = "mcpsh")]
#[command(author, version, about = "Shell tools for LLM tool calling over MCP", long_about = None)]
struct Cli {
    /// Path to the server list
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Run a single query and exit
    #[arg(short = 'P', long)]
    prompt: Option<String>,

    /// Completion model to use
    #[arg(long, env = "MCPSH_MODEL")]
    model: Option<String>,

    /// Maximum completion rounds per turn
    #[arg(long, default_value_t = 8)]
    max_tool_rounds: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP SSE server
    Serve {
        /// Address to bind
        #[arg(short, long, env = "MCPSH_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Serve { bind }) => {
            if let Err(e) = server::serve(bind).await {
                eprintln!("{} {}", "Server error:".red(), e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_chat(
                &cli.config,
                cli.prompt.as_deref(),
                cli.model.as_deref(),
                cli.max_tool_rounds,
            )
            .await
            {
                eprintln!("{} {}", "Error:".red(), e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_chat(
    config_path: &str,
    prompt: Option<&str>,
    model: Option<&str>,
    max_tool_rounds: usize,
) -> anyhow::Result<()> {
    let config = McpConfig::load_from_file(config_path)?;

    let mut set = ClientSet::new();
    for (name, url) in config.sse_servers()? {
        set.add_client(SseClient::new(name, url));
    }

    let clients = Arc::new(set);
    let mut connected = 0;
    for (name, result) in clients.connect_all().await {
        match result {
            Ok(()) => {
                println!("{} connected to {}", "✓".green(), name.bold());
                connected += 1;
            }
            Err(e) => eprintln!("{} {}: {}", "✗".red(), name.bold(), e),
        }
    }
    if connected == 0 {
        anyhow::bail!("no MCP server could be connected");
    }

    let tools = clients.list_all_tools().await;
    println!(
        "{} {} tool(s) available: {}",
        "→".cyan(),
        tools.len(),
        tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut provider = OpenAIProvider::from_env()?;
    if let Some(model) = model {
        provider = provider.with_model(model);
    }
    let dispatcher: Arc<dyn ToolDispatcher> = clients.clone();
    let mut agent = Agent::new(
        Box::new(provider),
        dispatcher,
        AgentConfig { max_tool_rounds },
    );

    let result = match prompt {
        Some(query) => run_single_turn(&mut agent, query).await,
        None => run_repl(&mut agent).await,
    };

    clients.disconnect_all().await;
    result
}

async fn run_single_turn(agent: &mut Agent, query: &str) -> anyhow::Result<()> {
    let reply = agent.run_turn(query).await?;
    println!("{reply}");
    Ok(())
}

/// An empty line ends the session, matching 'exit'/'quit'.
fn is_exit_input(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line == "exit" || line == "quit"
}

async fn run_repl(agent: &mut Agent) -> anyhow::Result<()> {
    println!("{}", "Press Enter on an empty line to leave.".dimmed());
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("you: ") {
            Ok(line) => {
                let query = line.trim();
                if is_exit_input(query) {
                    break;
                }
                let _ = editor.add_history_entry(query);

                match agent.run_turn(query).await {
                    Ok(reply) => println!("{} {}", "assistant:".cyan().bold(), reply),
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("{}", "Bye.".dimmed());
    Ok(())
}

fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt::init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_is_chat() {
        let cli = Cli::parse_from(["mcpsh"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, DEFAULT_CONFIG_FILE);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.max_tool_rounds, 8);
    }

    #[test]
    fn test_one_shot_prompt_with_model() {
        let cli = Cli::parse_from(["mcpsh", "-P", "list files", "--model", "gpt-4o-mini"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.prompt.as_deref(), Some("list files"));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_serve_subcommand() {
        let cli = Cli::parse_from(["mcpsh", "serve", "--bind", "0.0.0.0:9000"]);
        assert!(matches!(cli.command, Some(Commands::Serve { bind }) if bind.port() == 9000));
    }

    #[test]
    fn test_exit_inputs() {
        assert!(is_exit_input(""));
        assert!(is_exit_input("   "));
        assert!(is_exit_input("exit"));
        assert!(is_exit_input("quit"));
        assert!(!is_exit_input("echo hello"));
    }
}
