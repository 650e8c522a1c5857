use anyhow::{Context, Result};
use clap::Parser;
use hr_faq_bot::cli::{Cli, Commands};
use hr_faq_bot::{open_storage, utils, Backend, Chatbot, Session, Settings, Storage, Topic};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let backend = if cli.ephemeral {
        Backend::Memory
    } else {
        Backend::from_settings(&settings)
    };
    let (storage, seeded) = open_storage(&backend, &settings).await?;
    let bot = Chatbot::new(storage.clone(), &settings);

    let result = match cli.command {
        Commands::Ask { user, query } => handle_ask(&bot, &settings, user, query).await,
        Commands::Interactive { user } => handle_interactive(&bot, &settings, user).await,
        Commands::Stats { user } => handle_stats(&bot, &settings, user).await,
        Commands::History { user, json } => handle_history(&bot, &settings, user, json).await,
        Commands::Seed => handle_seed(&storage, seeded).await,
    };

    storage.close().await;

    result
}

fn login(session: &mut Session, settings: &Settings, user: &str) -> Result<()> {
    let identity = session.login(user, &settings.bot.corporate_domain)?;
    utils::print_success(&format!("Logged in as {} <{}>", identity.user_id, identity.email));
    Ok(())
}

async fn handle_ask(bot: &Chatbot, settings: &Settings, user: String, query: String) -> Result<()> {
    let mut session = Session::new();
    session.login(&user, &settings.bot.corporate_domain)?;

    let answer = bot.ask(&mut session, &query).await?;
    utils::print_answer(&answer);
    Ok(())
}

async fn handle_stats(bot: &Chatbot, settings: &Settings, user: String) -> Result<()> {
    let mut session = Session::new();
    session.login(&user, &settings.bot.corporate_domain)?;

    let count = bot.query_count(&session).await?;
    utils::print_info(&format!("Queries made: {}", count));
    Ok(())
}

async fn handle_history(
    bot: &Chatbot,
    settings: &Settings,
    user: String,
    json: bool,
) -> Result<()> {
    let mut session = Session::new();
    let user_id = session.login(&user, &settings.bot.corporate_domain)?.user_id.clone();

    let history = bot.archived_history(&user_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        utils::print_info("No archived messages");
    }
    for chat in history {
        utils::print_info(&format!(
            "[{}] {}:",
            chat.created_at.format("%Y-%m-%d %H:%M:%S"),
            chat.role
        ));
        utils::print_answer(&chat.content);
    }
    Ok(())
}

async fn handle_seed(storage: &Arc<dyn Storage>, inserted: usize) -> Result<()> {
    let count = storage.faq_count().await?;
    utils::print_success(&format!("Inserted {} FAQ entries, table holds {}", inserted, count));
    Ok(())
}

/// Next line from stdin, `None` at end of input
async fn read_line(reader: &mut BufReader<Stdin>) -> Result<Option<String>> {
    let mut input = String::new();
    if reader.read_line(&mut input).await? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn print_topics() {
    println!("Topics:");
    for (i, topic) in Topic::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, topic);
    }
    println!();
}

fn parse_topic(arg: &str) -> Option<Topic> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Topic::ALL.get(n - 1).copied(),
        _ => Topic::from_label(arg),
    }
}

async fn handle_interactive(
    bot: &Chatbot,
    settings: &Settings,
    user: Option<String>,
) -> Result<()> {
    utils::print_header("HR Chatbot");
    utils::print_info("Ask about vacations, bonuses, medical leave, insurance or remote work");
    utils::print_info("Type /help for commands (Ctrl+D to exit)\n");

    let mut session = Session::new();
    if let Some(user) = user {
        if let Err(e) = login(&mut session, settings, &user) {
            utils::print_error(&e.to_string());
        }
    }

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        if !session.is_authenticated() {
            utils::print_prompt("Employee ID or email: ");
            let Some(input) = read_line(&mut reader).await? else {
                break;
            };
            if let Err(e) = login(&mut session, settings, &input) {
                utils::print_error(&e.to_string());
            }
            continue;
        }

        utils::print_prompt("You: ");
        let Some(input) = read_line(&mut reader).await? else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        // Special commands
        if input == "/help" {
            println!("Special commands:");
            println!("  /topics        - List shortcut topics");
            println!("  /topic <n|name> - Ask about a shortcut topic");
            println!("  /stats         - Show how many queries you have made");
            println!("  /history       - Show your archived chat history");
            println!("  /logout        - Log out and clear this conversation");
            println!("  Ctrl+D         - Exit\n");
            continue;
        }

        if input == "/topics" {
            print_topics();
            continue;
        }

        if let Some(arg) = input.strip_prefix("/topic ") {
            match parse_topic(arg) {
                Some(topic) => {
                    let answer = bot.ask_topic(&mut session, topic).await?;
                    utils::print_info("Assistant: ");
                    utils::print_answer(&answer);
                }
                None => utils::print_error(&format!("Unknown topic '{}'", arg.trim())),
            }
            continue;
        }

        if input == "/stats" {
            match bot.query_count(&session).await {
                Ok(count) => utils::print_info(&format!("Queries made: {}", count)),
                Err(e) => utils::print_error(&e.to_string()),
            }
            println!();
            continue;
        }

        if input == "/history" {
            let user_id = session.user_id().unwrap_or_default().to_string();
            match bot.archived_history(&user_id).await {
                Ok(history) => {
                    for chat in history {
                        println!("{}: {}", chat.role, chat.content);
                    }
                }
                Err(e) => utils::print_error(&e.to_string()),
            }
            println!();
            continue;
        }

        if input == "/logout" {
            session.logout();
            utils::print_success("Logged out");
            println!();
            continue;
        }

        let answer = bot.ask(&mut session, &input).await?;
        utils::print_info("Assistant: ");
        utils::print_answer(&answer);
    }

    Ok(())
}
