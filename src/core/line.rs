//! A single line's characters, its run-length color overlay, and the
//! trailing color-comment fields that round-trip through save/load.
//!
//! Grounded on `original_source/pkg/text/line.go`. The original links lines
//! into a doubly-linked list and runs into a singly-linked list, both
//! GC-managed. Here the line list is a `slotmap` arena owned by
//! [`crate::core::document::Document`] (see that module), and a run list is
//! just a `Vec<Run>` — the linked list there was never load-bearing, only a
//! side effect of Go's allocator story.

use crate::core::color_code;
use crate::core::file_scanner::NewLineKind;

/// Line terminator kind. Re-exported under this name because a [`Line`]'s
/// terminator and the scanner token that produced it are the same concept.
pub type NewLineType = NewLineKind;

/// A run of `length` consecutive characters sharing one override color.
/// `color == 0` means "no override" (see [`crate::core::palette`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub length: usize,
    pub color: u8,
}

/// One line of the document.
///
/// Invariants (enforced by [`Line::normalize_runs`] after every mutation):
/// 1. No run has `length == 0`.
/// 2. No two adjacent runs share the same color.
/// 3. `runs` is never empty.
/// 4. `runs.iter().map(|r| r.length).sum() == chars.len() + 1` (the `+1`
///    accounts for the line's terminator position).
#[derive(Debug, Clone)]
pub struct Line {
    chars: Vec<char>,
    /// Whitespace trimmed off the body right before a `///` marker, kept so
    /// re-saving reproduces the original spacing exactly.
    spaces: Vec<char>,
    /// Raw color-code text following the `///` marker, re-parsed by
    /// [`Line::apply_color_code`].
    color_code: Vec<char>,
    pub newline_type: NewLineType,
    runs: Vec<Run>,
}

impl Line {
    pub fn new() -> Self {
        Self {
            chars: Vec::new(),
            spaces: Vec::new(),
            color_code: Vec::new(),
            newline_type: NewLineType::Lf,
            runs: vec![Run { length: 1, color: 0 }],
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn spaces(&self) -> &[char] {
        &self.spaces
    }

    pub fn set_spaces(&mut self, spaces: Vec<char>) {
        self.spaces = spaces;
    }

    pub fn color_code(&self) -> &[char] {
        &self.color_code
    }

    pub fn set_color_code(&mut self, code: Vec<char>) {
        self.color_code = code;
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Color of the right-most run.
    pub fn last_run_color(&self) -> u8 {
        self.runs.last().expect("runs is never empty").color
    }

    pub fn delete_char(&mut self, pos: usize) {
        self.chars.remove(pos);
        let (idx, _) = self.find_run_index(pos as isize);
        self.runs[idx].length -= 1;
        self.normalize_runs();
    }

    pub fn insert_char(&mut self, pos: usize, ch: char) {
        self.chars.insert(pos, ch);
        let (idx, _) = self.find_run_index(pos as isize - 1);
        self.runs[idx].length += 1;
    }

    /// Locate the run containing character position `pos`, and `pos`'s
    /// offset within that run. `pos == -1` returns the first run with
    /// offset `-1` (used by callers that want "the run before position 0").
    fn find_run_index(&self, pos: isize) -> (usize, isize) {
        let mut pos = pos;
        let mut idx = 0;
        while idx < self.runs.len() && pos >= self.runs[idx].length as isize {
            pos -= self.runs[idx].length as isize;
            idx += 1;
        }
        (idx, pos)
    }

    fn remove_empty_runs(&mut self) {
        self.runs.retain(|r| r.length != 0);
    }

    fn merge_same_runs(&mut self) {
        let mut i = 0;
        while i + 1 < self.runs.len() {
            if self.runs[i].color == self.runs[i + 1].color {
                let merged = self.runs[i + 1].length;
                self.runs[i].length += merged;
                self.runs.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    pub fn normalize_runs(&mut self) {
        self.remove_empty_runs();
        self.merge_same_runs();
    }

    /// Cut the run straddling `pos` into two runs at `pos`, so a run
    /// boundary exists exactly at `pos`. No-op if one already does.
    fn cut_run(&mut self, pos: isize) {
        let (idx, off) = self.find_run_index(pos);
        if off != 0 {
            let off = off as usize;
            let color = self.runs[idx].color;
            let remaining = self.runs[idx].length - off;
            self.runs[idx].length = off;
            self.runs.insert(idx + 1, Run { length: remaining, color });
        }
    }

    /// True if any run overrides the standard (no-override) color.
    pub fn is_colorized(&self) -> bool {
        self.runs.len() > 1 || self.runs[0].color != 0
    }

    /// Set the color of characters `[from, to)`.
    pub fn colorize(&mut self, color: u8, from: usize, to: usize) {
        if from < to && to <= self.chars.len() + 1 {
            self.cut_run(from as isize);
            self.cut_run(to as isize);
            let (mut idx, _) = self.find_run_index(from as isize);
            let mut remaining = to - from;
            while remaining != 0 {
                self.runs[idx].color = color;
                remaining -= self.runs[idx].length;
                idx += 1;
            }
            self.normalize_runs();
        }
    }

    pub fn string_range(&self, from: usize, to: usize) -> String {
        self.chars[from..to].iter().collect()
    }

    /// Delete characters `[from, to)`.
    pub fn delete_range(&mut self, from: usize, to: usize) {
        if from < to && to <= self.chars.len() + 1 {
            self.cut_run(from as isize);
            self.cut_run(to as isize);

            let end_of_line = self.chars.len() + 1;
            let next_idx = if to != end_of_line {
                Some(self.find_run_index(to as isize).0)
            } else {
                None
            };

            if from == 0 {
                match next_idx {
                    Some(idx) => {
                        self.runs.drain(0..idx);
                    }
                    None => self.runs.clear(),
                }
            } else {
                let (from_run_idx, _) = self.find_run_index(from as isize - 1);
                match next_idx {
                    Some(idx) => {
                        self.runs.drain(from_run_idx + 1..idx);
                    }
                    None => {
                        self.runs.drain(from_run_idx + 1..);
                        self.runs[from_run_idx].length += 1;
                    }
                }
            }

            self.normalize_runs();

            let to = if to == end_of_line { to - 1 } else { to };
            self.chars.drain(from..to);
        }
    }

    /// Split runs at `pos`, keeping the first part on `self` and returning
    /// the second part (for the new line the caller is about to create).
    /// `prev_last_run_color` is the last run's color of the line preceding
    /// `self` in the document, needed only when `pos == 0`.
    fn split_runs(&mut self, pos: usize, prev_last_run_color: Option<u8>) -> Vec<Run> {
        if pos == 0 {
            let color = match prev_last_run_color {
                Some(prev_color) if prev_color == self.runs[0].color => prev_color,
                _ => 0,
            };
            std::mem::replace(&mut self.runs, vec![Run { length: 1, color }])
        } else {
            let (idx, off) = self.find_run_index(pos as isize - 1);
            let split_pos = off as usize + 1;
            if self.runs[idx].length != split_pos {
                let color = self.runs[idx].color;
                let remaining = self.runs[idx].length - split_pos;
                self.runs[idx].length = split_pos;
                self.runs.insert(idx + 1, Run { length: remaining, color });
            }
            let tail = self.runs.split_off(idx + 1);
            self.runs[idx].length += 1;
            tail
        }
    }

    /// Split this line at character position `pos`, truncating `self` to
    /// `chars[..pos]` and returning a new `Line` holding `chars[pos..]`.
    /// The caller (document.rs) is responsible for linking the new line
    /// into the line arena.
    pub fn split(&mut self, pos: usize, prev_last_run_color: Option<u8>) -> Line {
        let new_chars = self.chars.split_off(pos);
        let new_runs = self.split_runs(pos, prev_last_run_color);
        Line {
            chars: new_chars,
            spaces: Vec::new(),
            color_code: Vec::new(),
            newline_type: NewLineType::Lf,
            runs: new_runs,
        }
    }

    /// Absorb `other`'s characters and runs, as when deleting the
    /// terminator between two lines. `other`'s runs become this line's
    /// tail; a trailing gap run on `self` loses its final (terminator)
    /// character since that position now belongs to `other`'s content.
    pub fn merge(&mut self, mut other: Line) {
        let had_chars = !self.chars.is_empty();
        self.chars.append(&mut other.chars);
        if had_chars {
            let last = self.runs.last_mut().expect("runs is never empty");
            last.length -= 1;
        } else {
            self.runs.clear();
        }
        self.runs.extend(other.runs);
        self.normalize_runs();
    }

    /// Re-parse `color_code` and apply it as a sequence of [`Line::colorize`]
    /// calls. Unknown letters map to color 0 (no override), matching the
    /// color-code scanner's tolerant parse policy.
    pub fn apply_color_code(&mut self) {
        let code = self.color_code.clone();
        let mut scanner = color_code::Scanner::new(&code);
        let mut column: usize = 0;
        loop {
            match scanner.scan() {
                color_code::Token::Eoc => break,
                color_code::Token::Number(n) => column += n as usize,
                color_code::Token::NumberedLetter(n, letter) => {
                    let color = color_code::letter_to_color(letter);
                    self.colorize(color, column, column + n as usize);
                    column += n as usize;
                }
                color_code::Token::Letter(letter) => {
                    let color = color_code::letter_to_color(letter);
                    let end = self.chars.len() + 1;
                    self.colorize(color, column, end);
                }
            }
        }
    }

    /// Encode `runs` back into compact color-code text (the inverse of
    /// [`Line::apply_color_code`]). A trailing uncolored run is omitted —
    /// it represents "no more overrides to the end of the line" and needs
    /// no explicit gap count.
    pub fn encode_color_code(&self) -> String {
        let mut parts = Vec::new();
        let last = self.runs.len() - 1;
        for (i, run) in self.runs.iter().enumerate() {
            if i == last && run.color == 0 {
                break;
            }
            if run.color == 0 {
                parts.push(run.length.to_string());
            } else if i == last {
                parts.push(color_code::color_to_letter(run.color).to_string());
            } else {
                parts.push(format!("{}{}", run.length, color_code::color_to_letter(run.color)));
            }
        }
        parts.join(" ")
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_line_has_one_run_covering_the_terminator() {
        let line = Line::new();
        assert_eq!(line.runs(), &[Run { length: 1, color: 0 }]);
        assert!(!line.is_colorized());
    }

    #[test]
    fn insert_and_delete_extend_the_surrounding_run() {
        let mut line = Line::new();
        line.insert_char(0, 'a');
        line.insert_char(1, 'b');
        line.insert_char(2, 'c');
        assert_eq!(line.chars(), &['a', 'b', 'c']);
        assert_eq!(line.runs(), &[Run { length: 4, color: 0 }]);

        line.delete_char(1);
        assert_eq!(line.chars(), &['a', 'c']);
        assert_eq!(line.runs(), &[Run { length: 3, color: 0 }]);
    }

    #[test]
    fn colorize_splits_and_merges_runs() {
        let mut line = Line::new();
        for c in "hello".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(1, 1, 3);
        assert_eq!(
            line.runs(),
            &[
                Run { length: 1, color: 0 },
                Run { length: 2, color: 1 },
                Run { length: 3, color: 0 },
            ]
        );
        assert!(line.is_colorized());

        // Re-coloring the same range with color 0 merges back to one run.
        line.colorize(0, 1, 3);
        assert_eq!(line.runs(), &[Run { length: 6, color: 0 }]);
        assert!(!line.is_colorized());
    }

    #[test]
    fn colorize_to_end_of_line_covers_the_terminator_position() {
        let mut line = Line::new();
        for c in "ab".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(2, 0, 3);
        assert_eq!(line.runs(), &[Run { length: 3, color: 2 }]);
    }

    #[test]
    fn delete_range_removes_characters_and_renormalizes_runs() {
        let mut line = Line::new();
        for c in "hello".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(1, 1, 3);
        line.delete_range(1, 3);
        assert_eq!(line.chars(), &['h', 'l', 'o']);
        assert_eq!(line.runs(), &[Run { length: 4, color: 0 }]);
    }

    #[test]
    fn split_moves_tail_characters_and_runs_to_a_new_line() {
        let mut line = Line::new();
        for c in "hello".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(1, 3, 6);
        let tail = line.split(3, None);
        assert_eq!(line.chars(), &['h', 'e', 'l']);
        assert_eq!(tail.chars(), &['l', 'o']);
        assert_eq!(line.runs(), &[Run { length: 4, color: 0 }]);
        assert_eq!(tail.runs(), &[Run { length: 3, color: 1 }]);
    }

    #[test]
    fn split_at_zero_inherits_prev_color_only_on_exact_match() {
        let mut line = Line::new();
        for c in "abc".chars() {
            line.insert_char(line.len(), c);
        }
        let tail = line.split(0, Some(5));
        // self.runs[0].color was 0, prev color 5 doesn't match -> new first run is 0
        assert_eq!(line.runs(), &[Run { length: 1, color: 0 }]);
        assert_eq!(tail.chars(), &['a', 'b', 'c']);
    }

    #[test]
    fn merge_reattaches_tail_line_after_deleting_a_terminator() {
        let mut line = Line::new();
        for c in "hel".chars() {
            line.insert_char(line.len(), c);
        }
        let mut tail = Line::new();
        for c in "lo".chars() {
            tail.insert_char(tail.len(), c);
        }
        tail.colorize(2, 0, 3);
        line.merge(tail);
        assert_eq!(line.chars(), &['h', 'e', 'l', 'l', 'o']);
        assert_eq!(
            line.runs(),
            &[Run { length: 3, color: 0 }, Run { length: 3, color: 2 }]
        );
    }

    #[test]
    fn apply_color_code_parses_numbered_letters_and_trailing_letter() {
        let mut line = Line::new();
        for c in "hello world".chars() {
            line.insert_char(line.len(), c);
        }
        line.set_color_code("1 4r 1 5G".chars().collect());
        line.apply_color_code();
        assert!(line.is_colorized());
        assert_eq!(line.string_range(1, 5), "ello");
    }

    #[test]
    fn encode_color_code_round_trips_through_apply() {
        let mut line = Line::new();
        for c in "hello world".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(1, 1, 5);
        line.colorize(6, 6, 12);
        let code = line.encode_color_code();
        let mut roundtrip = Line::new();
        for c in "hello world".chars() {
            roundtrip.insert_char(roundtrip.len(), c);
        }
        roundtrip.set_color_code(code.chars().collect());
        roundtrip.apply_color_code();
        assert_eq!(roundtrip.runs(), line.runs());
    }
}
