//! The caret position within a document.
//!
//! Grounded on the `cursorX`/`curLineNum`/`cursorMem` fields of
//! `original_source/data/experiments/c_text.go`'s `TextImpl`. The visual-
//! column memory (`mem`) is what makes repeated up/down movement track a
//! column past a short line and then resume it — see
//! [`crate::core::document::Document::move_up`]/`move_down`, which recompute
//! `col` from `mem` and a line's tab-expanded width on every vertical move.

/// `line` is 1-based (matches `Document`'s line numbering); `col` is a
/// 0-based character index, `0..=line.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
    /// Remembered visual column for vertical movement, updated by
    /// `Document::update_cursor_mem` after any horizontal move.
    pub mem: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            line: 1,
            col: 0,
            mem: 0,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
