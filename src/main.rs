use ai_dispatch::cli::{Args, Commands, load_config};
use ai_dispatch::{Dispatcher, ProviderCounters, ProviderId, ResponseEnvelope};
use clap::Parser;
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_dispatch=info".into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting AI Dispatch");
    let config = load_config(args.config.as_deref())?;
    let dispatcher = Dispatcher::new(config);

    match args.command {
        Commands::Ask { provider, query, requester, session, json } => {
            let response = dispatcher.dispatch(&provider, &query, requester, session).await;
            print_response(&response, json)?;
        }
        Commands::Action { provider, action, requester, session, json } => {
            let response = dispatcher
                .handle_action(&provider, &action, requester, session)
                .await;
            print_response(&response, json)?;
        }
        Commands::Status => {
            print_status(dispatcher.provider_status().await);
        }
        Commands::Stats => {
            print_stats(dispatcher.usage_stats().await, dispatcher.cache_size().await);
        }
        Commands::Interactive { provider, requester } => {
            run_interactive(&dispatcher, &provider, requester).await?;
        }
    }

    Ok(())
}

fn print_response(response: &ResponseEnvelope, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{}", response.content);
    let provider = response
        .provider
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "\n[{provider} | {:?} | confidence {:.2} | {} tokens | ${:.4} | {:.2}s]",
        response.status, response.confidence, response.tokens_used, response.cost,
        response.execution_time,
    );
    if !response.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &response.suggestions {
            println!("  • {suggestion}");
        }
    }
    Ok(())
}

fn print_status(status: HashMap<ProviderId, bool>) {
    println!("📊 Provider Status:");
    for id in ProviderId::ALL {
        let available = status.get(&id).copied().unwrap_or(false);
        println!(
            "  {:<10} {}",
            id.as_str(),
            if available { "✅ available" } else { "❌ unavailable" }
        );
    }
}

fn print_stats(stats: HashMap<ProviderId, ProviderCounters>, cached: usize) {
    println!("📊 Usage Stats:");
    for id in ProviderId::ALL {
        let counters = stats.get(&id).copied().unwrap_or_default();
        println!(
            "  {:<10} {} requests, {} tokens, {} errors",
            id.as_str(),
            counters.requests, counters.tokens, counters.errors
        );
    }
    println!("  {} cached responses", cached);
}

async fn run_interactive(
    dispatcher: &Dispatcher,
    provider: &str,
    requester: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🤖 Interactive mode against '{provider}'. Type 'help' for commands.");

    // One session per interactive run, so context builds up across lines.
    let session = requester;

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                show_interactive_help();
                continue;
            }
            "status" => {
                print_status(dispatcher.provider_status().await);
                continue;
            }
            "stats" => {
                print_stats(dispatcher.usage_stats().await, dispatcher.cache_size().await);
                continue;
            }
            _ => {}
        }

        let response = if let Some(action) = input.strip_prefix('/') {
            dispatcher
                .handle_action(provider, action.trim(), requester, session)
                .await
        } else {
            dispatcher.dispatch(provider, input, requester, session).await
        };
        print_response(&response, false)?;
    }

    println!("Goodbye!");
    Ok(())
}

fn show_interactive_help() {
    println!("📖 Interactive Mode Commands:");
    println!("  status     - Probe provider availability");
    println!("  stats      - Show usage counters");
    println!("  /<action>  - Follow-up on the last answer (clarify, deeper, optimize, performance, security)");
    println!("  help       - Show this help message");
    println!("  quit       - Exit");
    println!("\n💡 Enter any other text to dispatch it as a query.");
}
