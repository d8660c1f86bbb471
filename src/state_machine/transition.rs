//! Pure state transition function

use super::event::ExchangeFailure;
use super::state::SessionContext;
use super::{Effect, Event, SessionState};
use thiserror::Error;

pub const EMPTY_MESSAGE_NOTICE: &str = "Please enter a message.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("An exchange is already in progress")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User submission
        // ============================================================
        (
            SessionState::Sending { .. } | SessionState::RetryScheduled { .. },
            Event::UserSubmit { .. },
        ) => Err(TransitionError::Busy),

        (_, Event::UserSubmit { text }) => Ok(submit(state, context, &text)),

        // ============================================================
        // Replies
        // ============================================================
        (SessionState::Sending { message, .. }, Event::ReplyReceived { reply, received_at }) => {
            Ok(TransitionResult::new(SessionState::Success).with_effects([
                Effect::HideTyping,
                Effect::render_bot(reply.clone()),
                Effect::RecordExchange {
                    user: message.clone(),
                    bot: reply,
                    timestamp: received_at,
                },
                Effect::SetProcessing(false),
            ]))
        }

        // ============================================================
        // Failure and retry
        // ============================================================
        (SessionState::Sending { message, retries }, Event::ExchangeFailed { failure, attempt })
            if attempt == *retries =>
        {
            Ok(fail(message, *retries, context, &failure))
        }

        (
            SessionState::RetryScheduled {
                message, retries, ..
            },
            Event::RetryTimeout { attempt },
        ) if attempt == *retries => Ok(TransitionResult::new(SessionState::Sending {
            message: message.clone(),
            retries: *retries,
        })
        .with_effects([
            Effect::ShowTyping,
            Effect::SendRequest {
                message: message.clone(),
                attempt,
            },
        ])),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

fn submit(state: &SessionState, context: &SessionContext, text: &str) -> TransitionResult {
    let message = text.trim();

    if message.is_empty() {
        return TransitionResult::new(state.clone())
            .with_effect(Effect::notice(EMPTY_MESSAGE_NOTICE));
    }

    if message.encode_utf16().count() > context.max_message_length {
        return TransitionResult::new(state.clone()).with_effect(Effect::notice(format!(
            "Message too long. Please keep it under {} characters.",
            context.max_message_length
        )));
    }

    TransitionResult::new(SessionState::Sending {
        message: message.to_string(),
        retries: 0,
    })
    .with_effects([
        Effect::render_user(message),
        Effect::ClearInput,
        Effect::SetProcessing(true),
        Effect::ShowTyping,
        Effect::SendRequest {
            message: message.to_string(),
            attempt: 0,
        },
    ])
}

fn fail(
    message: &str,
    retries: u32,
    context: &SessionContext,
    failure: &ExchangeFailure,
) -> TransitionResult {
    if failure.is_transient() && retries < context.max_retries {
        let next = retries + 1;
        let delay = context.retry_delay(next);
        return TransitionResult::new(SessionState::RetryScheduled {
            message: message.to_string(),
            retries: next,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        })
        .with_effects([
            Effect::HideTyping,
            Effect::notice(format!(
                "Connection issue. Retrying... ({next}/{})",
                context.max_retries
            )),
            Effect::ScheduleRetry {
                delay,
                attempt: next,
            },
        ]);
    }

    let notice = failure.notice();
    TransitionResult::new(SessionState::Failed {
        notice: notice.to_string(),
        error_kind: failure.error_kind(),
    })
    .with_effects([
        Effect::HideTyping,
        Effect::notice(notice),
        Effect::SetProcessing(false),
    ])
}
