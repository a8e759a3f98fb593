//! Visible-text extraction.
//!
//! Chat sites routinely ship screen-reader-only copies of their content
//! ("Claude said:", duplicated code fences) in 1x1 boxes. `innerText` includes
//! them, so a subtree containing such a node is rebuilt from its children,
//! dropping the hidden ones, while clean subtrees keep their native rendering.

use agora_protocols::{TextChild, TextNode};

/// Text of `root` as a sighted user sees it.
pub fn visible_text(root: &TextNode) -> String {
    let marked = Marked::build(root);
    if !marked.tainted {
        if root.rect.is_visually_hidden() {
            return String::new();
        }
        return root.rendered_text.trim().to_string();
    }
    let mut buf = TextBuffer::default();
    marked.render(&mut buf);
    buf.finish()
}

/// Snapshot tree annotated with whether a subtree holds a hidden node.
struct Marked<'a> {
    node: &'a TextNode,
    tainted: bool,
    children: Vec<MarkedChild<'a>>,
}

enum MarkedChild<'a> {
    Text(&'a str),
    Element(Marked<'a>),
}

impl<'a> Marked<'a> {
    fn build(node: &'a TextNode) -> Self {
        let children: Vec<MarkedChild<'a>> = node
            .children
            .iter()
            .map(|child| match child {
                TextChild::Text { text } => MarkedChild::Text(text),
                TextChild::Element(el) => MarkedChild::Element(Marked::build(el)),
            })
            .collect();
        let tainted = node.rect.is_visually_hidden()
            || children
                .iter()
                .any(|c| matches!(c, MarkedChild::Element(m) if m.tainted));
        Self {
            node,
            tainted,
            children,
        }
    }

    fn render(&self, buf: &mut TextBuffer) {
        if self.node.rect.is_visually_hidden() {
            return;
        }
        if !self.tainted {
            buf.push_inline(&self.node.rendered_text);
            return;
        }
        for child in &self.children {
            match child {
                MarkedChild::Text(text) => buf.push_inline(text),
                MarkedChild::Element(el) if el.node.block => {
                    buf.break_line();
                    el.render(buf);
                    buf.break_line();
                }
                MarkedChild::Element(el) => el.render(buf),
            }
        }
    }
}

/// Accumulates rendered text, separating block content with line breaks.
#[derive(Debug, Default)]
pub(crate) struct TextBuffer {
    out: String,
}

impl TextBuffer {
    pub(crate) fn push_inline(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn push_block(&mut self, text: &str) {
        self.break_line();
        self.out.push_str(text);
        self.break_line();
    }

    pub(crate) fn break_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Trimmed text with at most one blank line between paragraphs.
    pub(crate) fn finish(self) -> String {
        let mut result = String::with_capacity(self.out.len());
        let mut newlines = 0;
        for ch in self.out.trim().chars() {
            if ch == '\n' {
                newlines += 1;
                if newlines > 2 {
                    continue;
                }
            } else {
                newlines = 0;
            }
            result.push(ch);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_protocols::BoundingBox;

    fn text(s: &str) -> TextChild {
        TextChild::Text {
            text: s.to_string(),
        }
    }

    fn element(tag: &str, rect: BoundingBox, rendered: &str, block: bool, children: Vec<TextChild>) -> TextNode {
        TextNode {
            tag: tag.to_string(),
            rect,
            rendered_text: rendered.to_string(),
            block,
            children,
        }
    }

    fn visible() -> BoundingBox {
        BoundingBox::sized(300.0, 20.0)
    }

    #[test]
    fn test_untainted_subtree_uses_native_rendering() {
        let root = element(
            "div",
            visible(),
            "  line one\n\nline two  ",
            true,
            vec![text("ignored when untainted")],
        );
        assert_eq!(visible_text(&root), "line one\n\nline two");
    }

    #[test]
    fn test_hidden_node_dropped_from_tainted_ancestors() {
        // <div><p><span sr-only>Claude said:</span>Hi</p><p>there</p></div>
        let sr_only = element("span", BoundingBox::sized(1.0, 1.0), "Claude said:", false, vec![text("Claude said:")]);
        let first = element(
            "p",
            visible(),
            "Claude said:Hi",
            true,
            vec![TextChild::Element(sr_only), text("Hi")],
        );
        let second = element("p", visible(), "there", true, vec![text("there")]);
        let root = element(
            "div",
            visible(),
            "Claude said:Hi\nthere",
            true,
            vec![TextChild::Element(first), TextChild::Element(second)],
        );
        assert_eq!(visible_text(&root), "Hi\nthere");
    }

    #[test]
    fn test_visible_descendant_of_hidden_node_is_dropped() {
        // <div><span 1x1><p 200x20>LEAK</p></span><p>keep</p></div>
        let leak = element("p", BoundingBox::sized(200.0, 20.0), "LEAK", true, vec![text("LEAK")]);
        let clipped = element(
            "span",
            BoundingBox::sized(1.0, 1.0),
            "LEAK",
            false,
            vec![TextChild::Element(leak)],
        );
        let keep = element("p", visible(), "keep", true, vec![text("keep")]);
        let root = element(
            "div",
            visible(),
            "LEAK\nkeep",
            true,
            vec![TextChild::Element(clipped), TextChild::Element(keep)],
        );
        assert_eq!(visible_text(&root), "keep");
    }

    #[test]
    fn test_clean_snapshot_without_children_uses_rendered_text() {
        let root = element("div", visible(), "already rendered\ntext", true, Vec::new());
        assert_eq!(visible_text(&root), "already rendered\ntext");
    }

    #[test]
    fn test_untainted_sibling_keeps_its_own_rendering() {
        let hidden = element("span", BoundingBox::sized(1.0, 1.0), "x", false, vec![text("x")]);
        let clean = element("pre", visible(), "a  b\n  c", true, vec![text("different")]);
        let root = element(
            "div",
            visible(),
            "",
            true,
            vec![TextChild::Element(hidden), TextChild::Element(clean)],
        );
        assert_eq!(visible_text(&root), "a  b\n  c");
    }

    #[test]
    fn test_hidden_root_is_empty() {
        let root = element("div", BoundingBox::sized(1.0, 1.0), "secret", true, vec![text("secret")]);
        assert_eq!(visible_text(&root), "");
    }

    #[test]
    fn test_zero_size_node_is_not_hidden() {
        let root = element("div", BoundingBox::sized(0.0, 0.0), "floated", true, vec![]);
        assert_eq!(visible_text(&root), "floated");
    }

    #[test]
    fn test_buffer_collapses_blank_lines() {
        let mut buf = TextBuffer::default();
        buf.push_block("a");
        buf.push_inline("\n\n\n\n");
        buf.push_block("b");
        assert_eq!(buf.finish(), "a\n\nb");
    }
}
