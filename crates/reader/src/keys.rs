//! Keyboard shortcuts

/// Transport command bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Toggle,
    Next,
    Prev,
}

impl KeyCommand {
    /// Map a key code (`Space`, `ArrowRight`, `ArrowLeft`) to a command.
    /// Keys only act while the reader has focus.
    pub fn from_code(code: &str, has_focus: bool) -> Option<Self> {
        if !has_focus {
            return None;
        }
        match code {
            "Space" => Some(KeyCommand::Toggle),
            "ArrowRight" => Some(KeyCommand::Next),
            "ArrowLeft" => Some(KeyCommand::Prev),
            _ => None,
        }
    }
}
