//! Module: Clipboard
//! But: System clipboard access behind a swappable trait.
//!
//! *Signed: kryon.kas*

use std::cell::RefCell;

use tracing::debug;

use crate::error::{Result, WalletError};

/// Accepts a string for the system clipboard.
pub trait ClipboardService {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard of the desktop session.
///
/// On Linux the selection is served by the owning process, so the handle is
/// kept for the generator's lifetime. A holding clipboard also blocks each
/// write until another application replaces the contents; use it when the
/// process exits right after copying.
#[derive(Default)]
pub struct SystemClipboard {
    handle: RefCell<Option<arboard::Clipboard>>,
    hold: bool,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding() -> Self {
        Self {
            handle: RefCell::new(None),
            hold: true,
        }
    }

    pub fn holds_until_replaced(&self) -> bool {
        self.hold
    }

    fn set(
        &self,
        clipboard: &mut arboard::Clipboard,
        text: &str,
    ) -> std::result::Result<(), arboard::Error> {
        #[cfg(target_os = "linux")]
        {
            use arboard::SetExtLinux;
            if self.hold {
                return clipboard.set().wait().text(text.to_owned());
            }
        }
        clipboard.set_text(text.to_owned())
    }
}

impl ClipboardService for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut handle = self.handle.borrow_mut();
        let clipboard = match &mut *handle {
            Some(clipboard) => clipboard,
            slot @ None => slot.insert(arboard::Clipboard::new().map_err(|e| {
                WalletError::ClipboardWriteFailure(format!("clipboard unavailable: {e}"))
            })?),
        };

        self.set(clipboard, text)
            .map_err(|e| WalletError::ClipboardWriteFailure(e.to_string()))?;
        debug!(len = text.len(), hold = self.hold, "clipboard updated");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::rc::Rc;

    use super::*;

    /// Records every write; shares its log with the test through `Rc`.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryClipboard {
        pub(crate) writes: Rc<RefCell<Vec<String>>>,
    }

    impl ClipboardService for MemoryClipboard {
        fn write_text(&self, text: &str) -> Result<()> {
            self.writes.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    /// Always refuses, like a headless session.
    pub(crate) struct DeniedClipboard;

    impl ClipboardService for DeniedClipboard {
        fn write_text(&self, _text: &str) -> Result<()> {
            Err(WalletError::ClipboardWriteFailure(
                "permission denied".to_string(),
            ))
        }
    }

    #[test]
    fn test_system_clipboard_modes() {
        assert!(!SystemClipboard::new().holds_until_replaced());
        assert!(SystemClipboard::holding().holds_until_replaced());
        assert!(SystemClipboard::new().handle.borrow().is_none());
    }

    #[test]
    fn test_memory_clipboard_records_writes() {
        let clipboard = MemoryClipboard::default();
        clipboard.write_text("first").unwrap();
        clipboard.write_text("second").unwrap();
        assert_eq!(*clipboard.writes.borrow(), vec!["first", "second"]);
    }
}
