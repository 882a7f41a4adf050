//! Clipboard abstraction. `core` never talks to a concrete clipboard
//! implementation directly — the consumer binary supplies one (the
//! terminal binary's `copypasta-ext` backend, see `src/tui_app.rs`).

/// A system clipboard collaborator. [`crate::core::document::Document`]'s
/// cut/copy/paste operations are generic over this trait so the core crate
/// carries no windowing or display-server dependency.
pub trait ClipboardProvider {
    /// Replace the clipboard contents.
    fn set_contents(&mut self, text: String) -> Result<(), String>;

    /// Read the current clipboard contents.
    fn get_contents(&mut self) -> Result<String, String>;
}

/// An in-memory clipboard, useful for tests and headless operation.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: String,
}

impl ClipboardProvider for MemoryClipboard {
    fn set_contents(&mut self, text: String) -> Result<(), String> {
        self.contents = text;
        Ok(())
    }

    fn get_contents(&mut self) -> Result<String, String> {
        Ok(self.contents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_round_trips() {
        let mut clip = MemoryClipboard::default();
        clip.set_contents("hello".to_string()).unwrap();
        assert_eq!(clip.get_contents().unwrap(), "hello");
    }
}
