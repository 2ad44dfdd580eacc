const MAX_MESSAGE_LEN: usize = 80;

/// Strip `[color-tag]`-style markers, keep only the first non-empty line, and
/// clip to 80 characters — the display rule every FAILED message goes through.
pub fn clean_message(raw: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '[' => in_tag = true,
            ']' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }

    let first_line = out
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    if first_line.chars().count() > MAX_MESSAGE_LEN {
        first_line.chars().take(MAX_MESSAGE_LEN).collect()
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_tags() {
        assert_eq!(clean_message("[red]doesn't look valid[/red]"), "doesn't look valid");
    }

    #[test]
    fn keeps_only_first_non_empty_line() {
        assert_eq!(clean_message("\n\nfirst line\nsecond line"), "first line");
    }

    #[test]
    fn clips_to_eighty_chars() {
        let long = "x".repeat(200);
        assert_eq!(clean_message(&long).len(), 80);
    }

    #[test]
    fn passes_through_plain_text() {
        assert_eq!(clean_message("plain error"), "plain error");
    }
}
