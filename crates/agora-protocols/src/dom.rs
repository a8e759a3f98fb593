//! DOM data exchanged between the page capability and the bridge engine.

use serde::{Deserialize, Serialize};

/// Rendered box of an element in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size at the origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether the element takes up any rendered space at all.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Near-zero box that is still laid out, e.g. a 1x1 screen-reader-only
    /// span. Such nodes carry text a sighted user never sees.
    pub fn is_visually_hidden(&self) -> bool {
        self.area() < 2.0 && self.width + self.height > 0.0
    }
}

/// Bundle of per-node facts used by container discovery.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Lowercase tag name.
    pub tag: String,
    /// Rendered text of the subtree (innerText).
    pub inner_text: String,
    pub rect: BoundingBox,
    /// Computed `overflow-y`.
    #[serde(default)]
    pub overflow_y: String,
    /// Textarea, text input or contenteditable region.
    #[serde(default)]
    pub editable: bool,
    /// Carries the seen marker.
    #[serde(default)]
    pub seen: bool,
}

impl NodeInfo {
    pub fn has_area(&self) -> bool {
        self.rect.has_area()
    }

    /// Whether the computed style makes this node the scrollable message list.
    pub fn is_scroll_container(&self) -> bool {
        matches!(self.overflow_y.as_str(), "auto" | "scroll" | "overlay")
    }

    pub fn is_body(&self) -> bool {
        self.tag == "body"
    }
}

/// Structural snapshot of a subtree, enough to reconstruct visible text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub tag: String,
    pub rect: BoundingBox,
    /// Aggregate rendered text of the subtree (innerText).
    pub rendered_text: String,
    /// Block-level layout; separates its text from siblings with a newline.
    #[serde(default)]
    pub block: bool,
    #[serde(default)]
    pub children: Vec<TextChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextChild {
    Text { text: String },
    Element(TextNode),
}

/// A visible interactive control (button, role=button, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Position in the page's control list at the time of the scan.
    pub index: usize,
    /// Accessible label (aria-label or title).
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub text: String,
}

impl Control {
    /// Lowercased, trimmed label and text, skipping empty ones.
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        [self.label.as_str(), self.text.as_str()]
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        meta: false,
        shift: false,
    };

    /// CDP `Input.dispatchKeyEvent` modifier bit field.
    pub fn bits(&self) -> i32 {
        let mut flags = 0;
        if self.alt {
            flags |= 1;
        }
        if self.ctrl {
            flags |= 2;
        }
        if self.meta {
            flags |= 4;
        }
        if self.shift {
            flags |= 8;
        }
        flags
    }
}

/// A single simulated key press (down + up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    pub modifiers: Modifiers,
    /// Editing commands executed with the press (e.g. `selectAll`).
    pub commands: Vec<String>,
}

impl KeyPress {
    pub fn new(key: &str, code: &str, key_code: u32) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            modifiers: Modifiers::NONE,
            commands: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.push(command.to_string());
        self
    }

    /// Plain Enter; submits in most chat inputs.
    pub fn enter() -> Self {
        Self::new("Enter", "Enter", 13)
    }

    /// Shift+Enter; a line break that does not submit.
    pub fn soft_newline() -> Self {
        Self::enter().with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::NONE
        })
    }

    pub fn backspace() -> Self {
        Self::new("Backspace", "Backspace", 8)
    }

    /// Select-all with the platform's primary modifier.
    pub fn select_all() -> Self {
        let modifiers = if cfg!(target_os = "macos") {
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            }
        } else {
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            }
        };
        Self::new("a", "KeyA", 65)
            .with_modifiers(modifiers)
            .with_command("selectAll")
    }

    pub fn is_enter(&self) -> bool {
        self.key == "Enter"
    }
}

/// The main frame navigated; every handle into the old document is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub url: String,
}

/// A message the page wrote to its console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    pub level: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_reader_box_is_hidden() {
        assert!(BoundingBox::sized(1.0, 1.0).is_visually_hidden());
        assert!(BoundingBox::sized(0.0, 1.0).is_visually_hidden());
        assert!(!BoundingBox::sized(0.0, 0.0).is_visually_hidden());
        assert!(!BoundingBox::sized(40.0, 12.0).is_visually_hidden());
    }

    #[test]
    fn test_scroll_container_detection() {
        let mut info = NodeInfo {
            overflow_y: "auto".to_string(),
            ..Default::default()
        };
        assert!(info.is_scroll_container());
        info.overflow_y = "visible".to_string();
        assert!(!info.is_scroll_container());
    }

    #[test]
    fn test_modifier_bits() {
        let mods = Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(mods.bits(), 10);
        assert_eq!(KeyPress::soft_newline().modifiers.bits(), 8);
    }

    #[test]
    fn test_control_names() {
        let control = Control {
            index: 0,
            label: " Stop Response ".to_string(),
            text: String::new(),
        };
        let names: Vec<String> = control.names().collect();
        assert_eq!(names, vec!["stop response".to_string()]);
    }

    #[test]
    fn test_text_node_deserialize() {
        let json = r#"{
            "tag": "div",
            "rect": {"x": 0, "y": 0, "width": 100, "height": 20},
            "renderedText": "Hello",
            "block": true,
            "children": [
                {"kind": "text", "text": "Hel"},
                {"kind": "element", "tag": "span", "rect": {"x": 0, "y": 0, "width": 10, "height": 10},
                 "renderedText": "lo", "children": [{"kind": "text", "text": "lo"}]}
            ]
        }"#;
        let node: TextNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.children.len(), 2);
        assert!(matches!(&node.children[1], TextChild::Element(n) if n.tag == "span"));
    }
}
