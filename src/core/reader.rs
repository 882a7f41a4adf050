//! Forward-only streaming reader that overlays syntax-class colors with the
//! document's per-run palette overrides, one character at a time.
//!
//! Grounded on `original_source/pkg/text/reader.go`. The original holds a
//! pointer back into its `TextImpl`; here `Reader` stays free of any borrow
//! on [`crate::core::document::Document`] and takes `&Document` on every
//! call instead (see SPEC_FULL.md §4.6 — avoids a self-referential struct).

use crate::core::document::{Document, LineKey};
use crate::core::palette::{self, Color};
use crate::core::syntax::{self, SyntaxClass};

/// One character with its resolved foreground color and optional background
/// override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredChar {
    pub ch: char,
    pub fg: Color,
    pub bg: Option<Color>,
}

/// The un-overridden syntax-highlight foreground for a lexeme class.
pub fn symbol_class_to_color(class: SyntaxClass) -> Color {
    match class {
        SyntaxClass::None => Color { r: 255, g: 255, b: 255 },
        SyntaxClass::Comment => Color { r: 120, g: 120, b: 120 },
        SyntaxClass::Ident => Color { r: 200, g: 200, b: 200 },
        SyntaxClass::Keyword => Color { r: 210, g: 150, b: 50 },
        SyntaxClass::String => Color { r: 70, g: 210, b: 50 },
        SyntaxClass::Number => Color { r: 40, g: 235, b: 235 },
        SyntaxClass::ProcCall => Color { r: 200, g: 180, b: 100 },
    }
}

/// Streaming position within a [`Document`]. Reset with [`Reader::top_line`],
/// then walk forward with [`Reader::next_line`] / [`Reader::first_char`] /
/// [`Reader::next_char`].
pub struct Reader {
    cur_line: LineKey,
    cur_line_num: usize,
    column: usize,

    symbol_end: usize,
    symbol_class: SyntaxClass,
    symbol_color: Color,
    nesting_level: i32,
}

impl Reader {
    pub fn new(doc: &Document) -> Self {
        Self {
            cur_line: doc.top_line_key(),
            cur_line_num: doc.top_line_num(),
            column: 0,
            symbol_end: 0,
            symbol_class: SyntaxClass::None,
            symbol_color: symbol_class_to_color(SyntaxClass::None),
            nesting_level: 0,
        }
    }

    /// Reset to the document's top (first visible) line. Returns that
    /// line's 1-based line number.
    pub fn top_line(&mut self, doc: &Document) -> usize {
        self.cur_line = doc.top_line_key();
        self.cur_line_num = doc.top_line_num();
        self.column = 0;
        self.symbol_end = 0;
        self.symbol_class = SyntaxClass::None;
        self.nesting_level = 0;
        self.cur_line_num
    }

    /// Advance to the next line. Returns `None` once past the last line.
    pub fn next_line(&mut self, doc: &Document) -> Option<usize> {
        match doc.next_line_key(self.cur_line) {
            Some(key) => {
                self.cur_line = key;
                self.cur_line_num += 1;
                Some(self.cur_line_num)
            }
            None => None,
        }
    }

    fn highlight_syntax(&mut self, doc: &Document, ch: char) -> Color {
        let line = doc.line(self.cur_line);
        if self.column >= self.symbol_end {
            let tail = &line.chars()[self.column..];
            let (class, length, nesting) = syntax::scan(tail, self.nesting_level, self.symbol_class);
            self.symbol_class = class;
            self.symbol_end = self.column + length;
            self.nesting_level = nesting;
            self.symbol_color = symbol_class_to_color(class);
        }
        let _ = ch;
        self.symbol_color
    }

    fn colorize(&self, doc: &Document) -> palette::ColorInfo {
        let line = doc.line(self.cur_line);
        let run_color = run_color_at(line, self.column);
        palette::lookup(run_color)
    }

    /// Fetch the first character of the current line, if any.
    pub fn first_char(&mut self, doc: &Document) -> Option<ColoredChar> {
        self.column = 0;
        let line = doc.line(self.cur_line);
        if line.chars().is_empty() {
            return None;
        }
        self.symbol_end = 0;
        let ch = line.chars()[0];
        let fg = self.highlight_syntax(doc, ch);
        let info = self.colorize(doc);
        Some(ColoredChar {
            ch,
            fg: info.fg.unwrap_or(fg),
            bg: info.bg,
        })
    }

    /// Fetch the next character of the current line, if any remain.
    pub fn next_char(&mut self, doc: &Document) -> Option<ColoredChar> {
        self.column += 1;
        let line = doc.line(self.cur_line);
        if self.column == line.chars().len() {
            return None;
        }
        let ch = line.chars()[self.column];
        let fg = self.highlight_syntax(doc, ch);
        let info = self.colorize(doc);
        Some(ColoredChar {
            ch,
            fg: info.fg.unwrap_or(fg),
            bg: info.bg,
        })
    }

    /// Whether the line just exhausted by [`Reader::next_char`] ends on a
    /// colorized newline, meaning the full row (not just the text) should
    /// be painted with the returned background.
    pub fn should_paint_full_line(&self, doc: &Document) -> Option<Color> {
        let line = doc.line(self.cur_line);
        let run_color = run_color_at(line, self.column);
        let info = palette::lookup(run_color);
        info.bg
    }
}

/// The color of the run covering character position `pos` in `line`.
fn run_color_at(line: &crate::core::line::Line, pos: usize) -> u8 {
    let mut pos = pos;
    for run in line.runs() {
        if pos < run.length {
            return run.color;
        }
        pos -= run.length;
    }
    line.runs().last().map(|r| r.color).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_colors_are_distinct_per_class() {
        assert_ne!(
            symbol_class_to_color(SyntaxClass::Keyword),
            symbol_class_to_color(SyntaxClass::String)
        );
        assert_eq!(
            symbol_class_to_color(SyntaxClass::None),
            Color { r: 255, g: 255, b: 255 }
        );
    }

    #[test]
    fn run_color_at_walks_runs() {
        let mut line = crate::core::line::Line::new();
        for c in "abcde".chars() {
            line.insert_char(line.len(), c);
        }
        line.colorize(5, 2, 5);
        assert_eq!(run_color_at(&line, 0), 0);
        assert_eq!(run_color_at(&line, 1), 0);
        assert_eq!(run_color_at(&line, 2), 5);
        assert_eq!(run_color_at(&line, 4), 5);
    }
}
