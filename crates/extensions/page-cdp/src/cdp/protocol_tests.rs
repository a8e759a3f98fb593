use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Page.navigate".to_string(),
        params: Some(serde_json::json!({"url": "https://claude.ai/new"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Page.navigate"));
    assert!(json.contains("\"sessionId\":\"S1\""));
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"frameId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.method.is_none());
}

#[test]
fn test_page_info_tab_detection() {
    let json = r#"{
        "id": "page123",
        "type": "page",
        "title": "Claude",
        "url": "https://claude.ai/new",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/page123"
    }"#;
    let info: PageInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.id, "page123");
    assert!(info.is_tab());

    let worker: PageInfo = serde_json::from_str(
        r#"{"id": "w", "type": "service_worker", "title": "", "url": "https://x/sw.js"}"#,
    )
    .unwrap();
    assert!(!worker.is_tab());
}

#[test]
fn test_browser_version_pascal_case() {
    let json = r#"{
        "Browser": "Chrome/126.0.0.0",
        "Protocol-Version": "1.3",
        "User-Agent": "Mozilla/5.0",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/abc"
    }"#;
    let version: BrowserVersion = serde_json::from_str(json).unwrap();
    assert_eq!(version.protocol_version, "1.3");
    assert!(version.web_socket_debugger_url.ends_with("/abc"));
}

#[test]
fn test_frame_navigated_main_frame() {
    let json = r#"{"frame": {"id": "F1", "loaderId": "L", "url": "https://claude.ai/chat/1"}}"#;
    let event: FrameNavigated = serde_json::from_str(json).unwrap();
    assert!(event.frame.is_main());

    let json = r#"{"frame": {"id": "F2", "parentId": "F1", "url": "about:blank"}}"#;
    let event: FrameNavigated = serde_json::from_str(json).unwrap();
    assert!(!event.frame.is_main());
}

#[test]
fn test_remote_object_display() {
    let args: Vec<RemoteObject> = serde_json::from_str(
        r#"[
            {"type": "string", "value": "hydrated"},
            {"type": "number", "value": 3},
            {"type": "object", "subtype": "error", "description": "Error: boom"},
            {"type": "number", "unserializableValue": "NaN"}
        ]"#,
    )
    .unwrap();
    let shown: Vec<String> = args.iter().map(RemoteObject::display).collect();
    assert_eq!(shown, vec!["hydrated", "3", "Error: boom", "NaN"]);
}

#[test]
fn test_key_event_type_serialize() {
    let json = serde_json::to_string(&KeyEventType::RawKeyDown).unwrap();
    assert_eq!(json, "\"rawKeyDown\"");
}

#[test]
fn test_mouse_button_serialize() {
    let json = serde_json::to_string(&MouseButton::Left).unwrap();
    assert_eq!(json, "\"left\"");
}
