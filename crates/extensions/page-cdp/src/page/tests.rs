use agora_protocols::{KeyPress, PageError};
use serde_json::json;

use super::*;

#[test]
fn test_ok_reply_yields_value() {
    let value = decode_reply(json!({"ok": [1700000000000001u64, 1700000000000002u64]})).unwrap();
    let ids: Vec<u64> = serde_json::from_value(value).unwrap();
    assert_eq!(ids, vec![1700000000000001, 1700000000000002]);
}

#[test]
fn test_null_ok_reply() {
    assert_eq!(decode_reply(json!({"ok": null})).unwrap(), Value::Null);
}

#[test]
fn test_stale_reply_is_stale_node() {
    let err = decode_reply(json!({"stale": 42})).unwrap_err();
    assert!(matches!(err, PageError::StaleNode(42)));
}

#[test]
fn test_missing_and_error_replies() {
    let err = decode_reply(json!({"missing": "control 3"})).unwrap_err();
    assert!(matches!(err, PageError::NotFound(what) if what == "control 3"));

    let err = decode_reply(json!({"error": "x is not a function"})).unwrap_err();
    assert!(matches!(err, PageError::Script(msg) if msg.contains("not a function")));
}

#[test]
fn test_malformed_reply_is_script_error() {
    let err = decode_reply(json!("undefined")).unwrap_err();
    assert!(matches!(err, PageError::Script(_)));
}

#[test]
fn test_helper_expression_ends_with_call() {
    let expr = helper_expression("markSeen", &json!([7]));
    assert!(expr.starts_with("// In-page helper"));
    assert!(expr.ends_with("window.__agora.call(\"markSeen\", [7])"));
}

#[test]
fn test_describe_payload_decodes() {
    let value = decode_reply(json!({"ok": {
        "tag": "div",
        "innerText": "Hello",
        "rect": {"x": 0.0, "y": 10.0, "width": 300.0, "height": 40.0},
        "overflowY": "visible",
        "editable": false,
        "seen": true
    }}))
    .unwrap();
    let info: NodeInfo = serde_json::from_value(value).unwrap();
    assert_eq!(info.inner_text, "Hello");
    assert!(info.seen);
    assert!(!info.is_scroll_container());
}

#[test]
fn test_key_events() {
    let enter = key_event(&KeyPress::enter());
    assert_eq!(enter.text.as_deref(), Some("\r"));
    assert_eq!(enter.modifiers, 0);

    let soft = key_event(&KeyPress::soft_newline());
    assert_eq!(soft.text.as_deref(), Some("\r"));
    assert_eq!(soft.modifiers, 8);

    let select_all = key_event(&KeyPress::select_all());
    assert_eq!(select_all.text, None);
    assert_eq!(select_all.commands, vec!["selectAll".to_string()]);

    let backspace = key_event(&KeyPress::backspace());
    assert_eq!(backspace.text, None);
    assert_eq!(backspace.key_code, 8);

    let letter = key_event(&KeyPress::new("x", "KeyX", 88));
    assert_eq!(letter.text.as_deref(), Some("x"));
}
