//! Runtime for executing a chat session
//!
//! One task owns the session state, the history and the store. Callers talk
//! to it through a [`SessionHandle`]; the view layer subscribes to
//! [`ViewUpdate`]s.

mod executor;
pub mod traits;


pub use executor::{SessionRuntime, CONNECTION_LOST_NOTICE};
pub use traits::*;

use crate::db::KeyValueStore;
use crate::history::{ExportSnapshot, HistoryPersistence};
use crate::state_machine::{Author, SessionContext, SessionState};
use crate::transport::{ChatTransport, NetworkStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Updates for the view layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Append to the transcript
    Message {
        text: String,
        author: Author,
        at: DateTime<Utc>,
    },
    /// Transient notice, dismissed after `ttl`
    Notice { text: String, ttl: Duration },
    Typing(bool),
    /// Input disabled while true
    Processing(bool),
    InputCleared,
    TranscriptCleared,
    Connection { online: bool },
    StateChange { state: SessionState },
}

/// Requests from the front end to the session
#[derive(Debug)]
pub enum Command {
    Submit(String),
    Clear,
    Export(oneshot::Sender<ExportSnapshot>),
    ConnectivityChanged(bool),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chat session has stopped")]
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    view_tx: broadcast::Sender<ViewUpdate>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    /// Submit user text. Ignored while an exchange is in flight.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::Submit(text.into())).await
    }

    /// Empty the history, the persisted snapshot and the transcript
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.send(Command::Clear).await
    }

    /// Snapshot the current history
    pub async fn export(&self) -> Result<ExportSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Export(tx)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn connectivity_changed(&self, online: bool) -> Result<(), SessionError> {
        self.send(Command::ConnectivityChanged(online)).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewUpdate> {
        self.view_tx.subscribe()
    }

    /// Stop the session, aborting any in-flight request
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Load history from `store` and start a session task
pub fn spawn_session<T, S>(
    context: SessionContext,
    transport: T,
    store: S,
    network: NetworkStatus,
    clock: Arc<dyn Clock>,
) -> (SessionHandle, JoinHandle<()>)
where
    T: ChatTransport + 'static,
    S: KeyValueStore + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (view_tx, _) = broadcast::channel(128);
    let shutdown = CancellationToken::new();

    let history = HistoryPersistence::load(store, context.history_limit);
    let runtime = SessionRuntime::new(
        context,
        history,
        transport,
        network,
        clock,
        command_rx,
        view_tx.clone(),
        shutdown.clone(),
    );

    let task = tokio::spawn(runtime.run());

    let handle = SessionHandle {
        command_tx,
        view_tx,
        shutdown,
    };
    (handle, task)
}
