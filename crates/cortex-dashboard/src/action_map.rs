//! Single source of truth for key bindings (§4.4, §4.5). Both the Renderer's
//! footer hints and the Input Reader's dispatch read from here so the two
//! never drift apart.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleTab,
    BeginInstall,
    BeginBench,
    BeginDoctor,
    Confirm,
    Deny,
    Cancel,
    Submit,
    Backspace,
    TypeChar(char),
    Unknown,
}

/// One row of the bottom-bar legend: the key label and what it does in the
/// current state.
pub struct Binding {
    pub key: &'static str,
    pub description: &'static str,
}

/// Legend shown on the Home tab when idle (§4.4).
pub const HOME_IDLE_BINDINGS: &[Binding] = &[
    Binding { key: "1", description: "Install package" },
    Binding { key: "2", description: "Run benchmark" },
    Binding { key: "3", description: "Run doctor" },
    Binding { key: "Tab", description: "Switch tab" },
    Binding { key: "q", description: "Quit" },
];

/// Legend shown whenever an operation is active, regardless of tab.
pub const ACTIVE_OPERATION_BINDINGS: &[Binding] = &[
    Binding { key: "4 / Esc", description: "Cancel" },
    Binding { key: "Tab", description: "Switch tab" },
];

/// Legend for `WAITING_CONFIRMATION`.
pub const CONFIRMATION_BINDINGS: &[Binding] = &[
    Binding { key: "y", description: "Confirm" },
    Binding { key: "n / Esc", description: "Cancel" },
];

/// Map a raw key event to an [`Action`]. `digit_enabled` gates `1`/`2`/`3` so
/// they only start an operation from the idle Home tab, matching the
/// Operation Engine's own admission check (`Store::try_start`). `4` is
/// Esc's un-gated equivalent — both must cancel an operation that's already
/// active, so neither can be gated on `digit_enabled`.
pub fn map_key(ch: char, digit_enabled: bool) -> Action {
    match ch {
        'q' if digit_enabled => Action::Quit,
        '\t' => Action::ToggleTab,
        '1' if digit_enabled => Action::BeginInstall,
        '2' if digit_enabled => Action::BeginBench,
        '3' if digit_enabled => Action::BeginDoctor,
        '4' => Action::Cancel,
        'y' => Action::Confirm,
        'n' => Action::Deny,
        '\u{1b}' => Action::Cancel,
        '\r' | '\n' => Action::Submit,
        '\u{7f}' | '\u{8}' => Action::Backspace,
        c if !c.is_control() => Action::TypeChar(c),
        _ => Action::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_map_to_operations_when_enabled() {
        assert_eq!(map_key('1', true), Action::BeginInstall);
        assert_eq!(map_key('1', false), Action::TypeChar('1'));
    }

    #[test]
    fn escape_always_maps_to_cancel() {
        assert_eq!(map_key('\u{1b}', true), Action::Cancel);
        assert_eq!(map_key('\u{1b}', false), Action::Cancel);
    }

    #[test]
    fn four_always_maps_to_cancel() {
        assert_eq!(map_key('4', true), Action::Cancel);
        assert_eq!(map_key('4', false), Action::Cancel);
    }

    #[test]
    fn printable_characters_fall_through_to_typing() {
        assert_eq!(map_key('x', false), Action::TypeChar('x'));
    }
}
