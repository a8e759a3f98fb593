//! Input (mouse and keyboard) operations for CDP page session.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEvent, KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

impl PageSession {
    /// Click at viewport coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
            })),
        )
        .await?;

        for event_type in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Insert text at the caret, as an IME commit would.
    pub async fn type_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Typed {} characters", text.chars().count());
        Ok(())
    }

    /// Dispatch one key press: a down event (with its editing commands)
    /// followed by the matching up event.
    pub async fn dispatch_key(&self, key: &KeyEvent) -> Result<(), CdpError> {
        self.call("Input.dispatchKeyEvent", Some(key_down_params(key)))
            .await?;
        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key.key,
                "code": key.code,
                "windowsVirtualKeyCode": key.key_code,
                "modifiers": key.modifiers,
            })),
        )
        .await?;
        Ok(())
    }
}

pub(super) fn key_down_params(key: &KeyEvent) -> serde_json::Value {
    let mut params = json!({
        "type": key.down_type(),
        "key": key.key,
        "code": key.code,
        "windowsVirtualKeyCode": key.key_code,
        "nativeVirtualKeyCode": key.key_code,
        "modifiers": key.modifiers,
    });
    if let Some(text) = &key.text {
        params["text"] = json!(text);
        params["unmodifiedText"] = json!(text);
    }
    if !key.commands.is_empty() {
        params["commands"] = json!(key.commands);
    }
    params
}
