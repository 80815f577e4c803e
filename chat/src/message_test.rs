use super::*;

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_tags_match_feed_ids() {
    assert_eq!(Role::User.tag(), 0);
    assert_eq!(Role::Model.tag(), 1);
    assert_eq!(Role::from_tag(0), Some(Role::User));
    assert_eq!(Role::from_tag(1), Some(Role::Model));
    assert_eq!(Role::from_tag(2), None);
}

#[test]
fn role_parse_rejects_unknown_names() {
    assert_eq!(Role::parse("user"), Some(Role::User));
    assert_eq!(Role::parse("model"), Some(Role::Model));
    assert_eq!(Role::parse("assistant"), None);
    assert_eq!(Role::parse("User"), None);
}

#[test]
fn role_serializes_as_lowercase_string() {
    assert_eq!(serde_json::to_value(Role::Model).unwrap(), "model");
    let role: Role = serde_json::from_str("\"user\"").unwrap();
    assert_eq!(role, Role::User);
}

// =============================================================================
// Message
// =============================================================================

#[test]
fn message_serializes_role_as_integer_id() {
    let json = serde_json::to_value(Message::model("hi")).unwrap();
    assert_eq!(json, serde_json::json!({ "id": 1, "text": "hi" }));
}

#[test]
fn message_accepts_legacy_message_field() {
    let msg: Message = serde_json::from_str(r#"{"id":0,"message":"hello","senderName":"me"}"#).unwrap();
    assert_eq!(msg, Message::user("hello"));
}

#[test]
fn message_rejects_unknown_role_tag() {
    let err = serde_json::from_str::<Message>(r#"{"id":7,"text":"?"}"#).unwrap_err();
    assert!(err.to_string().contains("unknown message role tag"));
}

#[test]
fn message_requires_text() {
    assert!(serde_json::from_str::<Message>(r#"{"id":1}"#).is_err());
}

// =============================================================================
// Turn
// =============================================================================

#[test]
fn turn_from_message_copies_role_and_text() {
    let turn = Turn::from(&Message::user("how do I focus?"));
    assert_eq!(turn.role, Role::User);
    assert_eq!(turn.content, "how do I focus?");
}

#[test]
fn turn_rejects_unknown_role_string() {
    assert!(serde_json::from_str::<Turn>(r#"{"role":"system","content":"x"}"#).is_err());
}
