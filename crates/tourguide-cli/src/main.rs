//! Tourguide CLI - terminal chat with the tourguide assistant.
//!
//! This is the entry point for the `tourguide` binary.

mod command;
mod render;

use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use tourguide_client::{
    AssistantClient, ChatEvent, ChatSession, ClientConfig, RejectReason, SendOutcome, UserProfile,
};
use tourguide_core::Role;

use command::{next_line_or_interrupt, Command, HELP};
use render::{history_line, Printer};

/// Tourguide CLI - chat with the tourism assistant.
#[derive(Parser, Debug)]
#[command(name = "tourguide")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Assistant service URL.
    #[arg(long, env = "TOURGUIDE_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Answer language code.
    #[arg(long, env = "TOURGUIDE_LANGUAGE")]
    language: Option<String>,

    /// Traveller level, e.g. "adult" or "초등학생".
    #[arg(long, env = "TOURGUIDE_LEVEL")]
    level: Option<String>,

    /// Initial conversation subject.
    #[arg(long, env = "TOURGUIDE_SUBJECT")]
    subject: Option<String>,

    /// Ask for whole JSON answers instead of a stream.
    #[arg(long, default_value = "false")]
    json: bool,

    /// Request timeout in seconds.
    #[arg(long, env = "TOURGUIDE_TIMEOUT", default_value = "60")]
    timeout: u64,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("tourguide=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let config = ClientConfig {
        request_timeout_seconds: args.timeout,
        prefer_stream: !args.json,
        ..ClientConfig::with_base_url(&args.url)
    };
    let profile = UserProfile {
        language: args.language,
        level: args.level,
    };
    let chat = ChatSession::with_profile(AssistantClient::new(config)?, profile);
    if let Some(subject) = args.subject {
        chat.set_subject(Some(subject));
    }
    let mut events = chat.subscribe();
    tracing::debug!(url = %args.url, prefer_stream = !args.json, subject = ?chat.subject(), "Chat session ready");

    println!("Connected to {} (/help for commands)", args.url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = Printer::new();
    loop {
        print_prompt(&chat)?;
        let Some(line) = next_line_or_interrupt(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };

        match Command::parse(&line) {
            Command::Say(text) => converse(&chat, &text, &mut events, &mut printer).await?,
            Command::Subject(subject) => {
                chat.set_subject(subject);
                match chat.subject() {
                    Some(subject) => println!("Subject set to {subject}; starting a new conversation."),
                    None => println!("Subject cleared."),
                }
                drain(&mut events);
            }
            Command::History => {
                for turn in chat.turns() {
                    println!("{}", history_line(&turn));
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Nothing => {}
            Command::Unknown(name) => println!("Unknown command /{name}. Try /help."),
        }
    }

    Ok(())
}

fn print_prompt(chat: &ChatSession) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match chat.subject() {
        Some(subject) => write!(stdout, "you [{subject}]> ")?,
        None => write!(stdout, "you> ")?,
    }
    stdout.flush()
}

/// Run one exchange, printing the answer as it grows. Ctrl-C stops the
/// answer without leaving the program.
async fn converse(
    chat: &ChatSession,
    text: &str,
    events: &mut UnboundedReceiver<ChatEvent>,
    printer: &mut Printer,
) -> anyhow::Result<()> {
    let send = chat.send(text);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome?,
            Some(event) = events.recv() => show(&event, printer)?,
            _ = tokio::signal::ctrl_c() => chat.cancel(),
        }
    };

    // Updates emitted after the last poll of the event channel.
    while let Ok(event) = events.try_recv() {
        show(&event, printer)?;
    }

    match outcome {
        SendOutcome::Completed(turn) => print!("{}", printer.finish(&turn)),
        SendOutcome::Rejected(RejectReason::Busy) => println!("Still answering the previous question."),
        SendOutcome::Rejected(RejectReason::EmptyInput) => {}
    }
    std::io::stdout().flush()?;
    Ok(())
}

fn show(event: &ChatEvent, printer: &mut Printer) -> std::io::Result<()> {
    if let ChatEvent::TurnUpserted(turn) = event {
        if turn.role == Role::Assistant {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", printer.update(turn))?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn drain(events: &mut UnboundedReceiver<ChatEvent>) {
    while events.try_recv().is_ok() {}
}
