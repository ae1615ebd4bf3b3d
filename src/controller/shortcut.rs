//! キーボードショートカット

/// キー入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// キー名（`"Enter"` など）
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Ctrl+Enter / Cmd+Enter で読み上げ
    pub fn is_speak_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && self.key == "Enter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_shortcut_requires_modifier() {
        assert!(KeyPress::new("Enter").with_ctrl().is_speak_shortcut());
        assert!(KeyPress::new("Enter").with_meta().is_speak_shortcut());
        assert!(!KeyPress::new("Enter").is_speak_shortcut());
        assert!(!KeyPress::new("a").with_ctrl().is_speak_shortcut());
    }
}
