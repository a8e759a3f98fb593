//! Probe selection: a distinctive fragment of the sent message used to
//! recognise its echo in the conversation.

/// Longest trimmed line of `message`, cut to `max_chars` characters.
/// `None` when the message has no non-blank line.
pub fn select_probe(message: &str, max_chars: usize) -> Option<String> {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(None::<&str>, |best, line| match best {
            Some(b) if b.chars().count() >= line.chars().count() => Some(b),
            _ => Some(line),
        })
        .map(|line| line.chars().take(max_chars).collect::<String>())
        .map(|probe| probe.trim_end().to_string())
}

/// Whether rendered `text` contains `probe`, ignoring whitespace layout.
pub fn contains_probe(text: &str, probe: &str) -> bool {
    let probe = collapse_whitespace(probe);
    !probe.is_empty() && collapse_whitespace(text).contains(&probe)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
