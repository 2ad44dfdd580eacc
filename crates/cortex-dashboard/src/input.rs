//! Input Reader (C5): owns raw mode and decodes terminal key events into
//! [`Action`]s on a dedicated blocking thread, since `crossterm::event::read`
//! blocks the OS thread it runs on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use tokio::sync::mpsc;

use crate::action_map::{map_key, Action};

/// Restores the terminal to cooked mode on drop, so a panic mid-dashboard
/// never leaves the user's shell in raw mode.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enter() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub struct InputReader {
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn the blocking read loop. `digit_enabled` is read fresh on every
    /// key so `1`/`2`/`3` only start operations from an idle Home tab.
    pub fn spawn(digit_enabled: impl Fn() -> bool + Send + 'static) -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();

        std::thread::spawn(move || {
            while !stop_clone.load(Ordering::Acquire) {
                match event::poll(std::time::Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key)) = event::read() {
                            if key.kind != KeyEventKind::Press {
                                continue;
                            }
                            let action = decode(key.code, digit_enabled());
                            if tx.send(action).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(false) => continue,
                    Err(_) => break,
                }
            }
        });

        (Self { stop }, rx)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn decode(code: KeyCode, digit_enabled: bool) -> Action {
    match code {
        KeyCode::Esc => Action::Cancel,
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Tab => Action::ToggleTab,
        KeyCode::Char(c) => map_key(c, digit_enabled),
        _ => Action::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_control_keys_independent_of_char_map() {
        assert_eq!(decode(KeyCode::Esc, true), Action::Cancel);
        assert_eq!(decode(KeyCode::Enter, true), Action::Submit);
        assert_eq!(decode(KeyCode::Backspace, true), Action::Backspace);
        assert_eq!(decode(KeyCode::Tab, false), Action::ToggleTab);
    }

    #[test]
    fn char_keys_delegate_to_the_shared_action_map() {
        assert_eq!(decode(KeyCode::Char('1'), true), Action::BeginInstall);
        assert_eq!(decode(KeyCode::Char('1'), false), Action::TypeChar('1'));
    }
}
