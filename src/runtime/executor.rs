//! Session runtime executor

use super::traits::Clock;
use super::{Command, ViewUpdate};

use crate::db::KeyValueStore;
use crate::history::{HistoryEntry, HistoryPersistence};
use crate::state_machine::{
    transition, Effect, Event, ExchangeFailure, SessionContext, SessionState, TransitionError,
};
use crate::transport::{ChatRequest, ChatTransport, NetworkStatus, TransportError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

pub const CONNECTION_LOST_NOTICE: &str =
    "Connection lost. Messages will be sent when reconnected.";

/// Generic session runtime that can work with any transport and store
pub struct SessionRuntime<T, S>
where
    T: ChatTransport + 'static,
    S: KeyValueStore,
{
    context: SessionContext,
    state: SessionState,
    history: HistoryPersistence<S>,
    transport: Arc<T>,
    network: NetworkStatus,
    clock: Arc<dyn Clock>,
    command_rx: mpsc::Receiver<Command>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    view_tx: broadcast::Sender<ViewUpdate>,
    /// Cancels the loop and every in-flight attempt
    shutdown: CancellationToken,
    /// False once every handle is gone
    accepting: bool,
}

impl<T, S> SessionRuntime<T, S>
where
    T: ChatTransport + 'static,
    S: KeyValueStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        history: HistoryPersistence<S>,
        transport: T,
        network: NetworkStatus,
        clock: Arc<dyn Clock>,
        command_rx: mpsc::Receiver<Command>,
        view_tx: broadcast::Sender<ViewUpdate>,
        shutdown: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            context,
            state: SessionState::Idle,
            history,
            transport: Arc::new(transport),
            network,
            clock,
            command_rx,
            event_rx,
            event_tx,
            view_tx,
            shutdown,
            accepting: true,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            history_entries = self.history.history().len(),
            "Starting chat session"
        );

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => self.process_event(event),

                command = self.command_rx.recv(), if self.accepting => match command {
                    Some(command) => self.handle_command(command),
                    None => self.accepting = false,
                },
            }

            // Let an in-flight exchange finish after the last handle drops
            if !self.accepting && !self.state.is_processing() {
                break;
            }
        }

        tracing::info!("Chat session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit(text) => self.process_event(Event::UserSubmit { text }),
            Command::Clear => {
                tracing::info!(entries = self.history.history().len(), "Clearing chat history");
                self.history.clear();
                self.publish(ViewUpdate::TranscriptCleared);
            }
            Command::Export(reply) => {
                let snapshot = self.history.export(self.clock.now());
                if reply.send(snapshot).is_err() {
                    tracing::debug!("Export requester went away");
                }
            }
            Command::ConnectivityChanged(online) => {
                self.network.set_online(online);
                self.publish(ViewUpdate::Connection { online });
                if !online {
                    self.show_notice(CONNECTION_LOST_NOTICE.to_string());
                }
            }
        }
    }

    fn process_event(&mut self, event: Event) {
        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::Busy) => {
                tracing::debug!(state = self.state.name(), "Ignoring submission while busy");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping event");
                return;
            }
        };

        // Update state
        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::info!(
                from = old_state.name(),
                to = self.state.name(),
                "Session state changed"
            );
            self.publish(ViewUpdate::StateChange {
                state: self.state.clone(),
            });
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    /// Execute an effect. Network attempts and timers report back as events.
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RenderMessage { text, author } => {
                self.publish(ViewUpdate::Message {
                    text,
                    author,
                    at: self.clock.now(),
                });
            }

            Effect::ShowNotice { text } => self.show_notice(text),

            Effect::ClearInput => self.publish(ViewUpdate::InputCleared),

            Effect::SetProcessing(processing) => self.publish(ViewUpdate::Processing(processing)),

            Effect::ShowTyping => self.publish(ViewUpdate::Typing(true)),

            Effect::HideTyping => self.publish(ViewUpdate::Typing(false)),

            Effect::SendRequest { message, attempt } => self.spawn_attempt(message, attempt),

            Effect::ScheduleRetry { delay, attempt } => {
                tracing::info!(attempt, delay_ms = %delay.as_millis(), "Scheduling retry");
                let event_tx = self.event_tx.clone();
                let cancel = self.shutdown.child_token();
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx.send(Event::RetryTimeout { attempt }).await;
                        }
                    }
                });
            }

            Effect::RecordExchange {
                user,
                bot,
                timestamp,
            } => {
                self.history.record(HistoryEntry {
                    user,
                    bot,
                    timestamp,
                });
            }
        }
    }

    fn spawn_attempt(&self, message: String, attempt: u32) {
        let request = ChatRequest {
            message,
            timestamp: self.clock.now_millis(),
            history: self.history.history().last(self.context.context_window),
        };

        let transport = self.transport.clone();
        let network = self.network.clone();
        let clock = self.clock.clone();
        let event_tx = self.event_tx.clone();
        let deadline = self.context.request_timeout;
        let cancel = self.shutdown.child_token();

        tokio::spawn(async move {
            tracing::debug!(
                attempt,
                context_entries = request.history.len(),
                "Sending chat request"
            );

            // Race the request against its deadline and session shutdown.
            // Losing either race drops the request future, aborting it.
            let outcome = tokio::select! {
                biased;

                () = cancel.cancelled() => Err(TransportError::cancelled("Request aborted")),

                result = tokio::time::timeout(deadline, transport.send(&request)) => {
                    result.unwrap_or_else(|_| {
                        tracing::warn!(
                            attempt,
                            timeout_ms = %deadline.as_millis(),
                            "Chat request timed out"
                        );
                        Err(TransportError::timeout(format!(
                            "Request timed out after {}ms",
                            deadline.as_millis()
                        )))
                    })
                }
            };

            let event = match outcome {
                Ok(reply) => Event::ReplyReceived {
                    reply: reply.text,
                    received_at: clock.now_millis(),
                },
                Err(e) => Event::ExchangeFailed {
                    failure: ExchangeFailure::from_transport(e, network.is_online()),
                    attempt,
                },
            };
            let _ = event_tx.send(event).await;
        });
    }

    fn show_notice(&self, text: String) {
        self.publish(ViewUpdate::Notice {
            text,
            ttl: self.context.notice_ttl,
        });
    }

    fn publish(&self, update: ViewUpdate) {
        // No subscribers is fine; the view may attach later
        let _ = self.view_tx.send(update);
    }
}
