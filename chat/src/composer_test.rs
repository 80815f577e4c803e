use super::*;
use crate::message::Role;
use crate::session::GREETING;
use crate::storage::test_helpers::FlakyStorage;
use crate::storage::{KeyValueStorage, MemoryStorage};
use crate::store::StoreConfig;
use std::sync::{Arc, Mutex};
use time::macros::datetime;

fn store() -> SessionStore {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    SessionStore::open_at(storage, &StoreConfig::default(), datetime!(2025-03-01 12:00:00 UTC)).unwrap()
}

fn texts(store: &SessionStore) -> Vec<(Role, String)> {
    store.selected().messages.iter().map(|m| (m.role, m.text.clone())).collect()
}

/// Gateway answering from a script and recording what it was sent.
struct ScriptedGateway {
    replies: Mutex<Vec<Result<String, GatewayError>>>,
    seen: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl ScriptedGateway {
    fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
        Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl ChatGateway for ScriptedGateway {
    async fn send(&self, message: &str, history: &[Turn]) -> Result<String, GatewayError> {
        self.seen.lock().unwrap().push((message.to_string(), history.to_vec()));
        self.replies.lock().unwrap().remove(0)
    }
}

// =========================================================================
// submit
// =========================================================================

#[test]
fn submit_appends_user_message_and_awaits() {
    let mut store = store();
    let mut composer = Composer::new();
    let id = store.selected_id().clone();

    let pending = composer.submit(&mut store, "  I'm anxious about finals \n").unwrap();

    assert_eq!(pending.session_id, id);
    assert_eq!(pending.message, "I'm anxious about finals");
    assert!(pending.history.is_empty());
    assert_eq!(composer.state(&id), ComposerState::Awaiting);
    assert_eq!(texts(&store).last().unwrap(), &(Role::User, "I'm anxious about finals".to_string()));
    assert_eq!(store.load()[0].messages.len(), 2);
}

#[test]
fn submit_rejects_whitespace_without_state_change() {
    let mut store = store();
    let mut composer = Composer::new();
    let before = store.sessions().to_vec();

    assert!(matches!(composer.submit(&mut store, " \t\n"), Err(ComposeError::EmptyInput)));
    assert_eq!(store.sessions(), before.as_slice());
    assert_eq!(composer.state(store.selected_id()), ComposerState::Idle);
}

#[test]
fn submit_rejects_while_outstanding_without_state_change() {
    let mut store = store();
    let mut composer = Composer::new();
    composer.submit(&mut store, "first").unwrap();
    let before = store.sessions().to_vec();

    let err = composer.submit(&mut store, "second").unwrap_err();

    assert!(matches!(err, ComposeError::RequestOutstanding(_)));
    assert_eq!(store.sessions(), before.as_slice());
}

#[test]
fn single_flight_is_per_session() {
    let mut store = store();
    let mut composer = Composer::new();
    let first = store.selected_id().clone();
    composer.submit(&mut store, "in the first session").unwrap();

    store.create_session_at(datetime!(2025-03-01 12:10:00 UTC)).unwrap();
    let second = store.selected_id().clone();

    assert!(composer.submit(&mut store, "in the second session").is_ok());
    assert_eq!(composer.state(&first), ComposerState::Awaiting);
    assert_eq!(composer.state(&second), ComposerState::Awaiting);
}

fn flaky_store() -> (Arc<FlakyStorage>, SessionStore) {
    let flaky = Arc::new(FlakyStorage::default());
    let storage: Arc<dyn KeyValueStorage> = flaky.clone();
    let store = SessionStore::open_at(storage, &StoreConfig::default(), datetime!(2025-03-01 12:00:00 UTC)).unwrap();
    (flaky, store)
}

#[test]
fn submit_write_failure_leaves_store_and_composer_untouched() {
    let (flaky, mut store) = flaky_store();
    let mut composer = Composer::new();
    let before = store.sessions().to_vec();

    flaky.fail_writes(true);
    let err = composer.submit(&mut store, "hello").unwrap_err();

    assert!(matches!(err, ComposeError::Store(StoreError::Storage(_))));
    assert_eq!(store.sessions(), before.as_slice());
    assert_eq!(composer.state(store.selected_id()), ComposerState::Idle);

    flaky.fail_writes(false);
    assert!(composer.submit(&mut store, "hello").is_ok());
}

// =========================================================================
// resolve
// =========================================================================

#[test]
fn resolve_success_appends_model_reply() {
    let mut store = store();
    let mut composer = Composer::new();
    let pending = composer.submit(&mut store, "hello").unwrap();
    let id = pending.session_id.clone();

    let resolution = composer.resolve(&mut store, pending, Ok("Hi! How's your day going?".into())).unwrap();

    assert!(matches!(resolution, Resolution::Replied { ref text, .. } if text == "Hi! How's your day going?"));
    assert_eq!(composer.state(&id), ComposerState::Idle);
    assert_eq!(
        texts(&store),
        vec![
            (Role::Model, GREETING.to_string()),
            (Role::User, "hello".to_string()),
            (Role::Model, "Hi! How's your day going?".to_string()),
        ]
    );
    assert_eq!(store.load(), store.sessions());
}

#[test]
fn resolve_failure_appends_apology_and_keeps_error() {
    let mut store = store();
    let mut composer = Composer::new();
    let pending = composer.submit(&mut store, "hello").unwrap();

    let resolution = composer
        .resolve(&mut store, pending, Err(GatewayError::Transport("connection refused".into())))
        .unwrap();

    assert!(matches!(resolution, Resolution::Apologized { error: GatewayError::Transport(_), .. }));
    let messages = texts(&store);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], (Role::User, "hello".to_string()));
    assert_eq!(messages[2], (Role::Model, APOLOGY.to_string()));
}

#[test]
fn resolve_write_failure_keeps_reply_out_of_memory() {
    let (flaky, mut store) = flaky_store();
    let mut composer = Composer::new();
    let pending = composer.submit(&mut store, "hello").unwrap();
    let id = pending.session_id.clone();
    let before = store.sessions().to_vec();

    flaky.fail_writes(true);
    let err = composer.resolve(&mut store, pending, Ok("reply".into())).unwrap_err();

    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(store.sessions(), before.as_slice());
    assert_eq!(composer.state(&id), ComposerState::Idle);
}

#[test]
fn resolve_after_session_switch_is_discarded() {
    let mut store = store();
    let mut composer = Composer::new();
    let pending = composer.submit(&mut store, "hello").unwrap();
    let origin = pending.session_id.clone();

    store.create_session_at(datetime!(2025-03-01 12:30:00 UTC)).unwrap();
    let resolution = composer.resolve(&mut store, pending, Ok("late reply".into())).unwrap();

    assert!(matches!(resolution, Resolution::Discarded { reason: DiscardReason::SessionSwitched, .. }));
    assert_eq!(composer.state(&origin), ComposerState::Idle);
    assert_eq!(store.get(&origin).unwrap().messages.len(), 2);
    assert_eq!(store.selected().messages, vec![Message::model(GREETING)]);
}

#[test]
fn resolving_same_request_twice_is_stale() {
    let mut store = store();
    let mut composer = Composer::new();
    let pending = composer.submit(&mut store, "hello").unwrap();
    let duplicate = pending.clone();

    composer.resolve(&mut store, pending, Ok("reply".into())).unwrap();
    let resolution = composer.resolve(&mut store, duplicate, Ok("reply again".into())).unwrap();

    assert!(matches!(resolution, Resolution::Discarded { reason: DiscardReason::Stale, .. }));
    assert_eq!(store.selected().messages.len(), 3);
}

// =========================================================================
// send
// =========================================================================

#[tokio::test]
async fn send_success_adds_exactly_two_messages() {
    let mut store = store();
    let mut composer = Composer::new();
    let gateway = ScriptedGateway::new(vec![Ok("Let's breathe together 🌱".into())]);

    composer.send(&mut store, &gateway, "I feel overwhelmed").await.unwrap();

    let messages = texts(&store);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].0, Role::User);
    assert_eq!(messages[2], (Role::Model, "Let's breathe together 🌱".to_string()));
}

#[tokio::test]
async fn send_supplies_prior_turns_as_history() {
    let mut store = store();
    let mut composer = Composer::new();
    let gateway = ScriptedGateway::new(vec![Ok("first reply".into()), Ok("second reply".into())]);

    composer.send(&mut store, &gateway, "first").await.unwrap();
    composer.send(&mut store, &gateway, "second").await.unwrap();

    let seen = gateway.seen.lock().unwrap();
    assert!(seen[0].1.is_empty());
    assert_eq!(seen[1].0, "second");
    assert_eq!(
        seen[1].1,
        vec![
            Turn { role: Role::User, content: "first".into() },
            Turn { role: Role::Model, content: "first reply".into() },
        ]
    );
}

#[tokio::test]
async fn send_failure_adds_user_message_and_apology() {
    let mut store = store();
    let mut composer = Composer::new();
    let gateway = ScriptedGateway::new(vec![Err(GatewayError::Upstream { status: 500, message: "boom".into() })]);

    let resolution = composer.send(&mut store, &gateway, "hello").await.unwrap();

    assert!(matches!(resolution, Resolution::Apologized { .. }));
    let messages = texts(&store);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].1, APOLOGY);
    assert_eq!(composer.state(store.selected_id()), ComposerState::Idle);
}

#[tokio::test]
async fn send_empty_input_never_reaches_gateway() {
    let mut store = store();
    let mut composer = Composer::new();
    let gateway = ScriptedGateway::new(Vec::new());

    assert!(matches!(composer.send(&mut store, &gateway, "   ").await, Err(ComposeError::EmptyInput)));
    assert!(gateway.seen.lock().unwrap().is_empty());
}
