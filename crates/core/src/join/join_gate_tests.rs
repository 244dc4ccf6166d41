use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;

use crate::clock::{ManualClock, SystemClock};
use crate::errors::{Error, JoinConflict, RemoteError, Result, GENERIC_FAILURE_MESSAGE};
use crate::events::{AlertKind, MockSwipeEventSink, SwipeEvent};
use crate::feed::test_fixtures::item;
use crate::join::{
    DismissOutcome, EligibilityDecision, GateOutcome, JoinBackend, JoinGate, JoinOutcome,
    JoinResponse, SLOT_TAKEN_MESSAGE,
};
use crate::session::{Session, SessionContext};

// --- Mock JoinBackend ---
struct MockJoinBackend {
    decision: Mutex<Result<EligibilityDecision>>,
    response: Mutex<Option<Result<JoinResponse>>>,
    join_delay: StdDuration,
    can_join_calls: AtomicUsize,
    join_calls: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockJoinBackend {
    fn allowing() -> Self {
        Self {
            decision: Mutex::new(Ok(EligibilityDecision::allowed())),
            response: Mutex::new(None),
            join_delay: StdDuration::ZERO,
            can_join_calls: AtomicUsize::new(0),
            join_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_decision(self, decision: Result<EligibilityDecision>) -> Self {
        *self.decision.lock().unwrap() = decision;
        self
    }

    fn with_response(self, response: Result<JoinResponse>) -> Self {
        *self.response.lock().unwrap() = Some(response);
        self
    }

    fn with_join_delay(mut self, delay: StdDuration) -> Self {
        self.join_delay = delay;
        self
    }

    fn join_count(&self) -> usize {
        self.join_calls.lock().unwrap().len()
    }
}

fn copy_result<T: Clone>(result: &Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value.clone()),
        Err(Error::Remote(remote)) => Err(Error::Remote(remote.clone())),
        Err(other) => Err(Error::Remote(RemoteError::message(other.to_string()))),
    }
}

#[async_trait]
impl JoinBackend for MockJoinBackend {
    async fn can_join(&self, _user_id: &str) -> Result<EligibilityDecision> {
        self.can_join_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        copy_result(&self.decision.lock().unwrap())
    }

    async fn join(
        &self,
        candidate_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<JoinResponse> {
        self.join_calls.lock().unwrap().push((
            candidate_id.to_string(),
            user_id.to_string(),
            display_name.to_string(),
        ));
        if !self.join_delay.is_zero() {
            tokio::time::sleep(self.join_delay).await;
        }
        match &*self.response.lock().unwrap() {
            Some(response) => copy_result(response),
            None => Ok(JoinResponse {
                success: true,
                message: "Joined".to_string(),
                conflicting_active_item: None,
            }),
        }
    }
}

struct Fixture {
    backend: Arc<MockJoinBackend>,
    sink: MockSwipeEventSink,
    clock: Arc<ManualClock>,
    ctx: SessionContext,
    gate: JoinGate,
}

fn fixture(backend: MockJoinBackend) -> Fixture {
    let backend = Arc::new(backend);
    let sink = MockSwipeEventSink::new();
    let clock = Arc::new(ManualClock::at_epoch());
    let mut session = Session::new("user-1");
    session.display_name = Some("Robin".to_string());
    let ctx = SessionContext::new(Some(session));
    let gate = JoinGate::new(
        backend.clone(),
        ctx.clone(),
        Arc::new(sink.clone()),
        clock.clone(),
        Duration::milliseconds(5_000),
    );
    Fixture {
        backend,
        sink,
        clock,
        ctx,
        gate,
    }
}

async fn open(f: &Fixture, id: &str) -> GateOutcome {
    f.gate.on_right_commit(item(id)).await
}

#[tokio::test]
async fn test_successful_join_after_dwell() {
    let f = fixture(MockJoinBackend::allowing());

    let outcome = open(&f, "X").await;
    assert!(matches!(outcome, GateOutcome::Opened(ref p) if p.item.id == "X"));
    assert_eq!(f.gate.pending_join().unwrap().item.id, "X");

    f.clock.advance_millis(5_000);
    let dismissed = f.gate.dismiss().await;

    match dismissed {
        DismissOutcome::Completed(JoinOutcome::Joined(result)) => {
            assert_eq!(result.item.id, "X");
            assert_eq!(result.message, "Joined");
        }
        other => panic!("unexpected dismiss outcome: {:?}", other),
    }
    assert!(f.gate.pending_join().is_none());
    assert!(!f.gate.is_join_in_flight());
    assert!(f.gate.is_idle());

    let calls = f.backend.join_calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![("X".to_string(), "user-1".to_string(), "Robin".to_string())]
    );
    assert_eq!(
        f.sink
            .count(|e| matches!(e, SwipeEvent::MatchFound { result } if result.item.id == "X")),
        1
    );
}

#[tokio::test]
async fn test_dismiss_before_dwell_is_rejected() {
    let f = fixture(MockJoinBackend::allowing());
    open(&f, "X").await;

    assert_eq!(f.gate.dismiss().await, DismissOutcome::NotYetDismissible);
    f.clock.advance_millis(4_999);
    assert!(!f.gate.is_dismissible());
    assert_eq!(f.gate.dismiss().await, DismissOutcome::NotYetDismissible);
    assert_eq!(f.backend.join_count(), 0);

    f.clock.advance_millis(1);
    assert!(f.gate.is_dismissible());
    assert!(matches!(
        f.gate.dismiss().await,
        DismissOutcome::Completed(JoinOutcome::Joined(_))
    ));
}

#[tokio::test]
async fn test_concurrent_dismissals_join_once() {
    let f = fixture(MockJoinBackend::allowing().with_join_delay(StdDuration::from_millis(20)));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    let (first, second) = tokio::join!(f.gate.dismiss(), f.gate.dismiss());

    assert!(matches!(first, DismissOutcome::Completed(JoinOutcome::Joined(_))));
    assert_eq!(second, DismissOutcome::Ignored);
    assert_eq!(f.backend.join_count(), 1);
    assert_eq!(f.gate.dismiss().await, DismissOutcome::Ignored);
}

#[tokio::test]
async fn test_blocked_decision_creates_nothing() {
    let f = fixture(
        MockJoinBackend::allowing().with_decision(Ok(EligibilityDecision::blocked("cooldown"))),
    );

    let outcome = open(&f, "X").await;

    assert_eq!(
        outcome,
        GateOutcome::Blocked {
            reason: "cooldown".to_string()
        }
    );
    assert!(f.gate.pending_join().is_none());
    assert!(f.gate.is_idle());
    assert_eq!(f.sink.alerts(AlertKind::EligibilityBlocked), vec!["cooldown"]);
    assert_eq!(
        f.sink
            .count(|e| matches!(e, SwipeEvent::InterstitialShown { .. })),
        0
    );
}

#[tokio::test]
async fn test_blocked_without_reason_uses_default_message() {
    let f = fixture(MockJoinBackend::allowing().with_decision(Ok(EligibilityDecision {
        allowed: false,
        reason: None,
    })));

    let outcome = open(&f, "X").await;

    assert_eq!(
        outcome,
        GateOutcome::Blocked {
            reason: super::DEFAULT_BLOCKED_MESSAGE.to_string()
        }
    );
}

#[tokio::test]
async fn test_eligibility_transport_failure_fails_closed() {
    let f = fixture(
        MockJoinBackend::allowing()
            .with_decision(Err(Error::Remote(RemoteError::message("network down")))),
    );

    let outcome = open(&f, "X").await;

    assert_eq!(
        outcome,
        GateOutcome::Blocked {
            reason: "network down".to_string()
        }
    );
    assert!(f.gate.is_idle());
}

#[tokio::test]
async fn test_missing_session_redirects_to_sign_in() {
    let f = fixture(MockJoinBackend::allowing());
    f.ctx.clear();

    let outcome = open(&f, "X").await;

    assert_eq!(outcome, GateOutcome::SignInRequired);
    assert_eq!(f.backend.can_join_calls.load(Ordering::SeqCst), 0);
    assert!(f.gate.pending_join().is_none());
    assert_eq!(f.sink.events(), vec![SwipeEvent::SignInRequired]);
}

#[tokio::test]
async fn test_second_right_commit_is_rejected_while_pending() {
    let f = fixture(MockJoinBackend::allowing());
    open(&f, "X").await;

    assert_eq!(open(&f, "Y").await, GateOutcome::Busy);
    assert_eq!(f.gate.pending_join().unwrap().item.id, "X");
    assert_eq!(f.backend.can_join_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_right_commit_is_rejected_while_checking() {
    let f = fixture(MockJoinBackend::allowing());

    let (first, second) = tokio::join!(open(&f, "X"), open(&f, "Y"));

    assert!(matches!(first, GateOutcome::Opened(_)));
    assert_eq!(second, GateOutcome::Busy);
    assert_eq!(f.backend.can_join_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_already_active_conflict() {
    let mut active = item("Z");
    active.title = "Friday Finals".to_string();
    let f = fixture(MockJoinBackend::allowing().with_response(Ok(JoinResponse {
        success: false,
        message: "User already in a challenge".to_string(),
        conflicting_active_item: Some(active),
    })));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    let outcome = f.gate.dismiss().await;

    match outcome {
        DismissOutcome::Completed(JoinOutcome::Conflict { conflict, message }) => {
            assert_eq!(conflict, JoinConflict::AlreadyActiveElsewhere);
            assert!(message.contains("Friday Finals"));
        }
        other => panic!("unexpected dismiss outcome: {:?}", other),
    }
    assert!(f.gate.is_idle());
    assert_eq!(f.sink.alerts(AlertKind::AlreadyActiveElsewhere).len(), 1);
}

#[tokio::test]
async fn test_slot_taken_conflict() {
    let f = fixture(MockJoinBackend::allowing().with_response(Ok(JoinResponse {
        success: false,
        message: "This slot was already taken".to_string(),
        conflicting_active_item: None,
    })));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    let outcome = f.gate.dismiss().await;

    assert_eq!(
        outcome,
        DismissOutcome::Completed(JoinOutcome::Conflict {
            conflict: JoinConflict::SlotTaken,
            message: SLOT_TAKEN_MESSAGE.to_string(),
        })
    );
    assert!(f.gate.pending_join().is_none());
    assert_eq!(
        f.sink.count(|e| matches!(e, SwipeEvent::InterstitialClosed { item_id } if item_id == "X")),
        1
    );
}

#[tokio::test]
async fn test_conflict_from_error_code() {
    let f = fixture(MockJoinBackend::allowing().with_response(Err(Error::Remote(RemoteError {
        status: Some(409),
        code: Some("slot_taken".to_string()),
        ..Default::default()
    }))));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    assert!(matches!(
        f.gate.dismiss().await,
        DismissOutcome::Completed(JoinOutcome::Conflict {
            conflict: JoinConflict::SlotTaken,
            ..
        })
    ));
}

#[tokio::test]
async fn test_other_failures_derive_human_message() {
    let cases = vec![
        (
            Err(Error::Remote(RemoteError {
                details: Some("Challenge has started".to_string()),
                ..Default::default()
            })),
            "Challenge has started".to_string(),
        ),
        (
            Err(Error::Remote(RemoteError::default())),
            GENERIC_FAILURE_MESSAGE.to_string(),
        ),
        (
            Ok(JoinResponse {
                success: false,
                message: "Ticket sales closed".to_string(),
                conflicting_active_item: None,
            }),
            "Ticket sales closed".to_string(),
        ),
    ];

    for (response, expected) in cases {
        let f = fixture(MockJoinBackend::allowing().with_response(response));
        open(&f, "X").await;
        f.clock.advance_millis(5_000);

        let outcome = f.gate.dismiss().await;

        assert_eq!(
            outcome,
            DismissOutcome::Completed(JoinOutcome::Failed {
                message: expected.clone()
            })
        );
        assert!(f.gate.is_idle());
        assert_eq!(f.sink.alerts(AlertKind::JoinFailure), vec![expected]);
    }
}

#[tokio::test]
async fn test_serialized_error_when_no_text_fields() {
    let f = fixture(MockJoinBackend::allowing().with_response(Err(Error::Remote(RemoteError {
        status: Some(500),
        code: Some("INTERNAL".to_string()),
        ..Default::default()
    }))));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    match f.gate.dismiss().await {
        DismissOutcome::Completed(JoinOutcome::Failed { message }) => {
            assert!(message.contains("INTERNAL"));
        }
        other => panic!("unexpected dismiss outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_refusal_reports_serialized_response() {
    let f = fixture(MockJoinBackend::allowing().with_response(Ok(JoinResponse {
        success: false,
        message: "  ".to_string(),
        conflicting_active_item: None,
    })));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    let message = match f.gate.dismiss().await {
        DismissOutcome::Completed(JoinOutcome::Failed { message }) => message,
        other => panic!("unexpected dismiss outcome: {:?}", other),
    };

    assert_ne!(message, GENERIC_FAILURE_MESSAGE);
    assert!(message.contains(r#""success":false"#), "{}", message);
    assert!(f.gate.is_idle());
    assert_eq!(f.sink.alerts(AlertKind::JoinFailure), vec![message]);
}

#[tokio::test]
async fn test_dropped_join_future_clears_guard() {
    let f = fixture(MockJoinBackend::allowing().with_join_delay(StdDuration::from_millis(200)));
    open(&f, "X").await;
    f.clock.advance_millis(5_000);

    let timed_out = tokio::time::timeout(StdDuration::from_millis(10), f.gate.dismiss()).await;

    assert!(timed_out.is_err());
    assert!(f.gate.is_idle());
    assert!(!f.gate.is_join_in_flight());
    assert!(matches!(open(&f, "Y").await, GateOutcome::Opened(_)));
}

#[tokio::test]
async fn test_cancel_clears_pending_join() {
    let f = fixture(MockJoinBackend::allowing());
    open(&f, "X").await;

    assert!(f.gate.cancel());
    assert!(f.gate.pending_join().is_none());
    assert!(!f.gate.cancel());
    f.clock.advance_millis(5_000);
    assert_eq!(f.gate.dismiss().await, DismissOutcome::Ignored);
    assert_eq!(f.backend.join_count(), 0);
}

#[tokio::test]
async fn test_wait_until_dismissible_sleeps_out_dwell() {
    let backend = Arc::new(MockJoinBackend::allowing());
    let sink = MockSwipeEventSink::new();
    let gate = JoinGate::new(
        backend,
        SessionContext::new(Some(Session::new("user-1"))),
        Arc::new(sink.clone()),
        Arc::new(SystemClock),
        Duration::milliseconds(20),
    );

    assert!(!gate.wait_until_dismissible().await);
    gate.on_right_commit(item("X")).await;
    assert!(!gate.is_dismissible());

    assert!(gate.wait_until_dismissible().await);
    assert!(gate.is_dismissible());
    assert_eq!(
        sink.count(|e| matches!(e, SwipeEvent::InterstitialDismissible { item_id } if item_id == "X")),
        1
    );
}
