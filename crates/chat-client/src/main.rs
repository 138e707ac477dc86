//! Console chat client.

use anyhow::{Context, Result};
use chat_client::{
    format_display, parse_line, ChatClient, ClientConfig, ClientError, Command, Protocol, HELP,
};
use chat_core::{validate_name, Message};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "chat-client")]
#[clap(about = "Console client for the chat relay")]
struct Cli {
    /// Server host
    #[clap(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[clap(short, long, default_value = "5000")]
    port: u16,

    /// tcp or udp
    #[clap(short, long, default_value = "tcp")]
    transport: Protocol,

    /// Name to register (asked for when missing)
    #[clap(short, long)]
    name: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let name = match cli.name {
        Some(name) => name,
        None => loop {
            prompt("Name: ").await?;
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            let name = line.trim().to_string();
            match validate_name(&name) {
                Ok(()) => break name,
                Err(e) => println!("[ERROR] {e}"),
            }
        },
    };

    let config = ClientConfig::new(cli.host, cli.port, cli.transport);
    let mut client = ChatClient::connect(config).await?;
    match client.register(&name).await {
        Ok(welcome) => println!("[SYSTEM] {welcome}"),
        Err(ClientError::Rejected(reason)) => {
            println!("[ERROR] {}", reason.describe());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    println!("{HELP}");

    let (mut sender, mut receiver) = client.into_split();
    let me = name.clone();
    let mut printer = tokio::spawn(async move {
        loop {
            match receiver.receive().await {
                Ok(Some(msg)) => println!("{}", format_display(&msg, &me)),
                Ok(None) => {
                    println!("[!] connection closed by server");
                    break;
                }
                Err(e) => {
                    println!("[ERROR] {e}");
                    break;
                }
            }
        }
    });

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut printer => return Ok(()),
        };
        // end of input behaves like /salir
        let Some(line) = line else { break };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("[ERROR] {e}");
                continue;
            }
        };

        if command == Command::Help {
            println!("{HELP}");
            continue;
        }
        if let Some(msg) = command.to_message(&name) {
            sender.send(&msg).await?;
        }
        if command == Command::Quit {
            printer.abort();
            sender.shutdown().await?;
            return Ok(());
        }
    }

    if let Err(e) = sender.send(&Message::disconnect(&name)).await {
        debug!(error = %e, "DISCONNECT not sent");
    }
    printer.abort();
    sender.shutdown().await?;
    Ok(())
}

async fn prompt(text: &str) -> std::io::Result<()> {
    let mut out = tokio::io::stdout();
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
