use serde_json::json;

use super::events::{PageEvent, decode_event};
use super::input::key_down_params;
use crate::cdp::protocol::{CdpResponse, KeyEvent};

fn event(method: &str, params: serde_json::Value) -> CdpResponse {
    serde_json::from_value(json!({
        "method": method,
        "params": params,
        "sessionId": "S1",
    }))
    .unwrap()
}

#[test]
fn test_main_frame_navigation_is_reported() {
    let evt = event(
        "Page.frameNavigated",
        json!({"frame": {"id": "F1", "url": "https://gemini.google.com/app/42"}}),
    );
    match decode_event(&evt) {
        Some(PageEvent::Navigated(nav)) => assert_eq!(nav.url, "https://gemini.google.com/app/42"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_sub_frame_navigation_is_ignored() {
    let evt = event(
        "Page.frameNavigated",
        json!({"frame": {"id": "F2", "parentId": "F1", "url": "https://ads.example/"}}),
    );
    assert_eq!(decode_event(&evt), None);
}

#[test]
fn test_console_call_joins_arguments() {
    let evt = event(
        "Runtime.consoleAPICalled",
        json!({
            "type": "warning",
            "args": [
                {"type": "string", "value": "retrying"},
                {"type": "number", "value": 2}
            ],
            "executionContextId": 1,
            "timestamp": 0.0
        }),
    );
    match decode_event(&evt) {
        Some(PageEvent::Console(msg)) => {
            assert_eq!(msg.level, "warning");
            assert_eq!(msg.text, "retrying 2");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unrelated_event_is_ignored() {
    let evt = event("Page.loadEventFired", json!({"timestamp": 1.0}));
    assert_eq!(decode_event(&evt), None);
}

#[test]
fn test_printing_key_goes_down_with_text() {
    let key = KeyEvent {
        key: "Enter".to_string(),
        code: "Enter".to_string(),
        key_code: 13,
        modifiers: 8,
        text: Some("\r".to_string()),
        commands: Vec::new(),
    };
    let params = key_down_params(&key);
    assert_eq!(params["type"], "keyDown");
    assert_eq!(params["text"], "\r");
    assert_eq!(params["modifiers"], 8);
    assert!(params.get("commands").is_none());
}

#[test]
fn test_command_key_is_raw() {
    let key = KeyEvent {
        key: "a".to_string(),
        code: "KeyA".to_string(),
        key_code: 65,
        modifiers: 2,
        text: None,
        commands: vec!["selectAll".to_string()],
    };
    let params = key_down_params(&key);
    assert_eq!(params["type"], "rawKeyDown");
    assert_eq!(params["commands"], json!(["selectAll"]));
    assert!(params.get("text").is_none());
}
