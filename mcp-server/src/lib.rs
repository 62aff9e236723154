//! Sequential-thinking MCP server speaking newline-delimited JSON-RPC over
//! stdio.

#![deny(clippy::print_stdout, clippy::print_stderr)]

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::{self};
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::message_processor::IncomingMessage;
use crate::message_processor::MessageProcessor;
use crate::outgoing_message::OutgoingJsonRpcMessage;
use crate::outgoing_message::OutgoingMessage;
use crate::outgoing_message::OutgoingMessageSender;
use crate::thought_display::ThoughtDisplay;

mod config;
mod message_processor;
mod outgoing_message;
mod resources;
mod think_tool;
mod thought_display;

pub use crate::config::Cli;
pub use crate::config::Color;
pub use crate::config::DISABLE_THOUGHT_LOGGING_ENV_VAR;
pub use crate::config::ServerConfig;
pub use crate::message_processor::SERVER_NAME;
pub use crate::resources::BRANCH_URI_TEMPLATE;
pub use crate::resources::BRANCHES_URI;
pub use crate::resources::HISTORY_URI;
pub use crate::resources::SESSION_URI;
pub use crate::resources::SUMMARY_URI;
pub use crate::think_tool::THINK_TOOL_NAME;

/// Size of the bounded channel between the stdin reader and the processor.
const CHANNEL_CAPACITY: usize = 128;

/// Log filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "info";

pub async fn run_main(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(config.color);

    let (incoming_tx, mut incoming_rx) = mpsc::channel::<IncomingMessage>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    // Task: read from stdin, push to `incoming_tx`.
    let stdin_reader_handle = tokio::spawn({
        async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                let line = tokio::select! {
                    line = lines.next_line() => line,
                    _ = &mut ctrl_c => {
                        info!("interrupted; shutting down");
                        break;
                    }
                };
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read from stdin: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<IncomingMessage>(&line) {
                    Ok(msg) => {
                        if incoming_tx.send(msg).await.is_err() {
                            // Receiver gone, nothing left to do.
                            break;
                        }
                    }
                    Err(e) => error!("Failed to deserialize JSON-RPC message: {e}"),
                }
            }

            debug!("stdin reader finished");
        }
    });

    // Task: process incoming messages.
    let processor_handle = tokio::spawn({
        let outgoing_message_sender = OutgoingMessageSender::new(outgoing_tx);
        let display = ThoughtDisplay::new(config.thought_logging, config.color);
        let mut processor = MessageProcessor::new(outgoing_message_sender, display);
        async move {
            while let Some(msg) = incoming_rx.recv().await {
                processor.process_message(msg).await;
            }

            processor.shutdown();
            info!("processor task exited (channel closed)");
        }
    });

    // Task: write outgoing messages to stdout.
    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(outgoing_message) = outgoing_rx.recv().await {
            let msg: OutgoingJsonRpcMessage = outgoing_message.into();
            match serde_json::to_string(&msg) {
                Ok(mut json) => {
                    json.push('\n');
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("Failed to write to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.flush().await {
                        error!("Failed to flush stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize JSON-RPC message: {e}"),
            }
        }

        info!("stdout writer exited (channel closed)");
    });

    // The usual exit path is stdin EOF. Dropping `incoming_tx` ends the
    // processor, which drops the last outgoing sender and ends the writer.
    let _ = tokio::join!(stdin_reader_handle, processor_handle, stdout_writer_handle);

    Ok(())
}

/// Installs a stderr subscriber. Users control the level with `RUST_LOG`.
fn init_tracing(with_ansi: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let stderr_fmt = tracing_subscriber::fmt::layer()
        .with_ansi(with_ansi)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(stderr_fmt).try_init();
}
