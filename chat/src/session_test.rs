use super::*;
use time::macros::datetime;

#[test]
fn greeting_session_has_single_model_message() {
    let session = Session::greeting_at(datetime!(2025-03-01 12:00:00.250 UTC));
    assert_eq!(session.messages, vec![Message::model(GREETING)]);
    assert_eq!(session.messages[0].role.tag(), 1);
}

#[test]
fn greeting_session_id_is_creation_millis() {
    let at = datetime!(2025-03-01 12:00:00.250 UTC);
    let session = Session::greeting_at(at);
    assert_eq!(session.id.millis(), Some(at.unix_timestamp_nanos() / 1_000_000));
    assert_eq!(session.created, at);
}

#[test]
fn greeting_session_truncates_sub_millisecond_precision() {
    let session = Session::greeting_at(datetime!(2025-03-01 12:00:00.250999 UTC));
    assert_eq!(session.created, datetime!(2025-03-01 12:00:00.250 UTC));
}

#[test]
fn session_id_non_numeric_has_no_millis() {
    assert_eq!(SessionId::from("abc").millis(), None);
    assert_eq!(SessionId::from_millis(42).as_str(), "42");
}

#[test]
fn session_serializes_created_as_rfc3339() {
    let session = Session::greeting_at(datetime!(2025-03-01 12:00:00 UTC));
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["created"], "2025-03-01T12:00:00Z");
    assert_eq!(json["id"], session.id.as_str());
    assert_eq!(json["messages"][0]["id"], 1);
}

#[test]
fn session_loads_browser_iso_timestamps() {
    let raw = r#"{"id":"1718000000000","messages":[{"id":1,"message":"Hey, how are you feeling today?"}],"created":"2024-06-10T06:13:20.000Z"}"#;
    let session: Session = serde_json::from_str(raw).unwrap();
    assert_eq!(session.id.as_str(), "1718000000000");
    assert_eq!(session.created, datetime!(2024-06-10 06:13:20 UTC));
    assert_eq!(session.messages, vec![Message::model(GREETING)]);
}

#[test]
fn turns_skip_leading_greeting() {
    let mut session = Session::greeting_at(datetime!(2025-03-01 12:00:00 UTC));
    session.messages.push(Message::user("I'm stressed about exams"));
    session.messages.push(Message::model("That sounds really tough."));

    let turns = session.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Model);
}

#[test]
fn turns_of_fresh_session_are_empty() {
    let session = Session::greeting_at(datetime!(2025-03-01 12:00:00 UTC));
    assert!(session.turns().is_empty());
}
