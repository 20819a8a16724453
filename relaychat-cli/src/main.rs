//! Relaychat terminal client

use anyhow::Result;
use clap::Parser;
use relaychat_core::consumer::{
    ChatSession, ConsumerError, ConversationView, Endpoint, HttpTransport, SendRejected,
    APOLOGY_MESSAGE,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Chat with a relaychat server from the terminal
#[derive(Parser, Debug)]
#[command(name = "relaychat", version, about, long_about = None)]
struct Args {
    /// Base URL of the relay server
    #[arg(short, long, env = "RELAYCHAT_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Name used in the greeting
    #[arg(short, long, default_value = "there")]
    name: String,

    /// Use the retrieval-augmented endpoint
    #[arg(short, long)]
    retrieval: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let endpoint = if args.retrieval {
        Endpoint::Retrieval
    } else {
        Endpoint::Chat
    };
    let transport = HttpTransport::new(&args.server, endpoint)?;
    debug!("Sending to {}", transport.url());

    let mut session = ChatSession::new(
        ConversationView::with_greeting(&args.name),
        Arc::new(transport),
    );
    if let Some(greeting) = session.view().last() {
        println!("{}\n", greeting.content);
    }

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        let _ = editor.add_history_entry(line.as_str());

        let mut stdout = std::io::stdout();
        let result = session
            .send(&line, |delta| {
                let _ = write!(stdout, "{}", delta);
                let _ = stdout.flush();
            })
            .await;

        match result {
            Ok(()) => println!("\n"),
            Err(ConsumerError::Rejected(SendRejected::Empty)) => continue,
            Err(ConsumerError::Rejected(reason)) => eprintln!("{}", reason),
            Err(e) => {
                debug!("Turn failed: {}", e);
                println!("\n{}\n", APOLOGY_MESSAGE);
            }
        }
    }

    Ok(())
}
