//! chatline - terminal chat client
//!
//! Sends each message with a short window of prior exchanges to a chat
//! endpoint, retrying connection failures with linear backoff and keeping
//! a bounded history in SQLite.

mod config;
mod db;
mod history;
mod runtime;
mod state_machine;
mod terminal;
mod transport;

use chrono::Utc;
use config::ChatConfig;
use db::Database;
use runtime::{spawn_session, SessionHandle, SystemClock};
use std::sync::Arc;
use terminal::{Action, LineInterpreter, Renderer, CLEAR_PROMPT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::connectivity::{run_health_probe, PROBE_TIMEOUT};
use transport::{HttpTransport, LoggingTransport, NetworkStatus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatline=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let http = Arc::new(HttpTransport::new(&config.endpoint)?);
    tracing::info!(url = %http.chat_url(), "Using chat endpoint");
    let network = NetworkStatus::new();

    let (handle, session_task) = spawn_session(
        config.session_context(),
        LoggingTransport::new(http.clone()),
        db,
        network.clone(),
        Arc::new(SystemClock),
    );
    let mut updates = handle.subscribe();

    let probe_cancel = CancellationToken::new();
    spawn_connectivity(
        http,
        network,
        &config,
        handle.clone(),
        probe_cancel.clone(),
    );

    let mut renderer = Renderer::new(std::io::stdout());
    renderer.welcome()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input = LineInterpreter::default();
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => renderer.render(&update)?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Terminal fell behind session updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            line = lines.next_line() => {
                // EOF quits
                let Some(line) = line? else { break };

                match input.interpret(&line) {
                    Action::Submit(text) => handle.submit(text).await?,
                    Action::ConfirmClear => renderer.prompt(CLEAR_PROMPT)?,
                    Action::Clear => handle.clear().await?,
                    Action::Cancelled => renderer.line("Clear cancelled.")?,
                    Action::Export => {
                        let snapshot = handle.export().await?;
                        let count = snapshot.conversations.len();
                        match snapshot.write_to(&config.export_dir, Utc::now()) {
                            Ok(path) => {
                                tracing::info!(
                                    path = %path.display(),
                                    count,
                                    "Exported chat history"
                                );
                                renderer.line(&format!(
                                    "Exported {count} conversations to {}",
                                    path.display()
                                ))?;
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Export failed");
                                renderer.line(&format!("Export failed: {e}"))?;
                            }
                        }
                    }
                    Action::Quit => break,
                }
            }
        }
    }

    probe_cancel.cancel();
    handle.shutdown();
    session_task.await?;

    Ok(())
}

/// Run the health probe and forward connectivity changes to the session
fn spawn_connectivity(
    http: Arc<HttpTransport>,
    network: NetworkStatus,
    config: &ChatConfig,
    handle: SessionHandle,
    cancel: CancellationToken,
) {
    let (changes_tx, mut changes_rx) = mpsc::channel(8);

    tokio::spawn(run_health_probe(
        http,
        network,
        config.health_interval,
        PROBE_TIMEOUT,
        changes_tx,
        cancel,
    ));

    tokio::spawn(async move {
        while let Some(online) = changes_rx.recv().await {
            if handle.connectivity_changed(online).await.is_err() {
                break;
            }
        }
    });
}
