use crate::editor::Editor;
use crate::error::EditorError;

/// Chords that toggle a mark. `mod` is the platform command key.
pub const MARK_HOTKEYS: [(&str, &str); 4] = [
    ("mod+b", "bold"),
    ("mod+i", "italic"),
    ("mod+u", "underline"),
    ("mod+`", "code"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub command: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: char,
}

impl Hotkey {
    pub fn new(key: char) -> Self {
        Self {
            command: false,
            shift: false,
            alt: false,
            key: key.to_ascii_lowercase(),
        }
    }

    pub fn command(key: char) -> Self {
        Self {
            command: true,
            ..Self::new(key)
        }
    }

    /// Parse a chord like `mod+b` or `ctrl+shift+x`. `ctrl`, `cmd` and `meta`
    /// all mean the command modifier.
    pub fn parse(chord: &str) -> Option<Self> {
        let (modifiers, key) = match chord.rsplit_once('+') {
            Some((modifiers, "")) => (modifiers.strip_suffix('+')?, "+"),
            Some((modifiers, key)) => (modifiers, key),
            None => ("", chord),
        };

        let mut chars = key.chars();
        let key = chars.next()?;
        if chars.next().is_some() {
            return None;
        }

        let mut hotkey = Self::new(key);
        for modifier in modifiers.split('+').filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "mod" | "ctrl" | "control" | "cmd" | "meta" => hotkey.command = true,
                "shift" => hotkey.shift = true,
                "alt" | "option" => hotkey.alt = true,
                _ => return None,
            }
        }
        Some(hotkey)
    }

    pub fn mark(&self) -> Option<&'static str> {
        MARK_HOTKEYS
            .iter()
            .find(|(chord, _)| Hotkey::parse(chord).as_ref() == Some(self))
            .map(|(_, mark)| *mark)
    }
}

impl Editor {
    /// Toggle the mark bound to `hotkey`. Returns whether the chord was handled.
    pub fn handle_hotkey(&mut self, hotkey: &Hotkey) -> Result<bool, EditorError> {
        let Some(mark) = hotkey.mark() else {
            return Ok(false);
        };
        tracing::debug!(mark, "hotkey toggles mark");
        self.toggle_mark(mark)?;
        Ok(true)
    }
}
