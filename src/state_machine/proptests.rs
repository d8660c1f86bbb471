//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::ExchangeFailure;
use super::*;
use crate::transport::TransportErrorKind;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::default()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_transport_error_kind() -> impl Strategy<Value = TransportErrorKind> {
    prop_oneof![
        Just(TransportErrorKind::Connection),
        Just(TransportErrorKind::Unreachable),
        Just(TransportErrorKind::Timeout),
        Just(TransportErrorKind::Cancelled),
        Just(TransportErrorKind::Format),
        Just(TransportErrorKind::Unknown),
        (400u16..600).prop_map(TransportErrorKind::Status),
    ]
}

fn arb_failure() -> impl Strategy<Value = ExchangeFailure> {
    (
        arb_transport_error_kind(),
        prop_oneof![
            Just("Connection failed".to_string()),
            Just("Failed to fetch".to_string()),
            Just("network unreachable".to_string()),
            Just("Invalid response format".to_string()),
            "[a-zA-Z ]{0,20}",
        ],
        any::<bool>(),
    )
        .prop_map(|(kind, message, offline)| ExchangeFailure {
            kind,
            message,
            offline,
        })
}

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Network),
        Just(ErrorKind::Timeout),
        Just(ErrorKind::Server),
        Just(ErrorKind::Format),
        Just(ErrorKind::Unknown),
    ]
}

fn arb_ready_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        Just(SessionState::Success),
        ("[a-zA-Z ]{1,30}", arb_error_kind())
            .prop_map(|(notice, error_kind)| SessionState::Failed { notice, error_kind }),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        ("[a-zA-Z]{1,20}", 0u32..=3)
            .prop_map(|(message, retries)| SessionState::Sending { message, retries }),
        ("[a-zA-Z]{1,20}", 1u32..=3).prop_map(|(message, retries)| {
            SessionState::RetryScheduled {
                message,
                retries,
                delay_ms: u64::from(retries) * 1000,
            }
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![arb_ready_state(), arb_busy_state()]
}

fn arb_valid_text() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z ]{0,29}"
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        prop_oneof![arb_valid_text(), Just("   ".to_string()), Just("x".repeat(501))]
            .prop_map(|text| Event::UserSubmit { text }),
        ("[a-zA-Z ]{1,30}", any::<i64>())
            .prop_map(|(reply, received_at)| Event::ReplyReceived { reply, received_at }),
        (arb_failure(), 0u32..5).prop_map(|(failure, attempt)| Event::ExchangeFailed {
            failure,
            attempt
        }),
        (0u32..5).prop_map(|attempt| Event::RetryTimeout { attempt }),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &SessionState, context: &SessionContext) -> bool {
    match state {
        SessionState::Sending { message, retries } => {
            !message.trim().is_empty() && *retries <= context.max_retries
        }
        SessionState::RetryScheduled {
            retries, delay_ms, ..
        } => {
            *retries >= 1
                && *retries <= context.max_retries
                && u128::from(*delay_ms) == context.retry_delay(*retries).as_millis()
        }
        _ => true,
    }
}

fn effects_are_valid(
    effects: &[Effect],
    old_state: &SessionState,
    new_state: &SessionState,
) -> bool {
    let sends = effects
        .iter()
        .filter(|e| matches!(e, Effect::SendRequest { .. }))
        .count();
    let retries = effects
        .iter()
        .filter(|e| matches!(e, Effect::ScheduleRetry { .. }))
        .count();

    // At most one request or timer per step, and only where the state says so
    if sends > 1 || retries > 1 {
        return false;
    }
    if sends == 1 && !matches!(new_state, SessionState::Sending { .. }) {
        return false;
    }
    if retries == 1 && !matches!(new_state, SessionState::RetryScheduled { .. }) {
        return false;
    }

    // Leaving the processing states always releases input
    let released = effects.contains(&Effect::SetProcessing(false));
    if old_state.is_processing() && !new_state.is_processing() && !released {
        return false;
    }

    true
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig { max_global_rejects: 16384, ..ProptestConfig::with_cases(1000) })]

    // Invariant 1: Valid state and effects after any transition
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::Idle;
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                prop_assert!(
                    is_valid_state(&result.new_state, &ctx),
                    "Invalid state: {:?}",
                    result.new_state
                );
                prop_assert!(
                    effects_are_valid(&result.effects, &state, &result.new_state),
                    "Invalid effects {:?} -> {:?}: {:?}",
                    state,
                    result.new_state,
                    result.effects
                );
                state = result.new_state;
            }
        }
    }

    // Invariant 2: Busy states reject every submission, with no effects
    #[test]
    fn prop_busy_rejects_submissions(state in arb_busy_state(), text in arb_valid_text()) {
        let result = transition(&state, &test_context(), Event::UserSubmit { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Invariant 3: Ready states accept valid submissions and send exactly once
    #[test]
    fn prop_ready_accepts_valid_text(state in arb_ready_state(), text in arb_valid_text()) {
        let result = transition(&state, &test_context(), Event::UserSubmit { text: text.clone() });
        prop_assert!(result.is_ok(), "Ready state should accept: {:?}", result);
        let result = result.unwrap();
        prop_assert_eq!(
            result.new_state,
            SessionState::Sending { message: text.trim().to_string(), retries: 0 }
        );
        prop_assert!(result.effects.contains(&Effect::SetProcessing(true)));
    }

    // Invariant 4: Non-transient failures never retry
    #[test]
    fn prop_non_transient_failures_are_terminal(retries in 0u32..=3, failure in arb_failure()) {
        prop_assume!(!failure.is_transient());
        let state = SessionState::Sending { message: "hi".to_string(), retries };
        let result = transition(
            &state,
            &test_context(),
            Event::ExchangeFailed { failure: failure.clone(), attempt: retries },
        ).unwrap();
        prop_assert_eq!(
            result.new_state,
            SessionState::Failed {
                notice: failure.notice().to_string(),
                error_kind: failure.error_kind(),
            }
        );
    }

    // Invariant 5: An exchange never makes more than max_retries + 1 attempts
    #[test]
    fn prop_attempts_are_bounded(failures in proptest::collection::vec(arb_failure(), 1..10)) {
        let ctx = test_context();
        let submit = Event::UserSubmit { text: "hi".to_string() };
        let mut state = transition(&SessionState::Idle, &ctx, submit).unwrap().new_state;
        let mut attempts = 1;

        for failure in failures {
            let SessionState::Sending { retries, .. } = state.clone() else { break };
            let failed = Event::ExchangeFailed { failure, attempt: retries };
            state = transition(&state, &ctx, failed).unwrap().new_state;
            if let SessionState::RetryScheduled { retries, .. } = state.clone() {
                let wake = Event::RetryTimeout { attempt: retries };
                state = transition(&state, &ctx, wake).unwrap().new_state;
                attempts += 1;
            }
        }

        prop_assert!(attempts <= ctx.max_retries + 1);
    }

    // Invariant 6: Stray transport events outside an exchange are rejected
    #[test]
    fn prop_ready_states_reject_transport_events(state in arb_ready_state(), event in arb_event()) {
        prop_assume!(!matches!(event, Event::UserSubmit { .. }));
        let result = transition(&state, &test_context(), event);
        prop_assert!(
            matches!(result, Err(TransitionError::InvalidTransition(_))),
            "Expected rejection, got {:?}",
            result
        );
    }

    // Invariant 7: Any state transition is deterministic
    #[test]
    fn prop_transition_is_pure(state in arb_state(), event in arb_event()) {
        let first = transition(&state, &test_context(), event.clone());
        let second = transition(&state, &test_context(), event);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            (a, b) => prop_assert!(false, "Divergent results: {:?} vs {:?}", a, b),
        }
    }
}
