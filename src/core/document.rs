//! The document: an arena of lines, the cursor, the selection, and every
//! editing operation a consumer drives through keystrokes.
//!
//! Grounded on `original_source/data/experiments/c_text.go`'s `TextImpl`.
//! The original's doubly-linked `*Line` list is GC-managed; here it is a
//! `slotmap::SlotMap<LineKey, LineNode>` arena (see SPEC_FULL.md §3.1), and
//! a line's own position (`curLineNum`/`cursorX`/`cursorMem`) is folded into
//! the already-defined [`Cursor`] rather than duplicated as three loose
//! fields.

use std::path::Path;

use slotmap::{new_key_type, SlotMap};

use crate::core::clipboard::ClipboardProvider;
use crate::core::cursor::Cursor;
use crate::core::file_scanner::{self, Token};
use crate::core::line::Line;
use crate::core::reader::Reader;
use crate::core::selection::Selection;

new_key_type! {
    /// A handle to a line in a [`Document`]'s arena. The Rust analogue of a
    /// `*Line` pointer in the original.
    pub struct LineKey;
}

struct LineNode {
    prev: Option<LineKey>,
    next: Option<LineKey>,
    line: Line,
}

/// The editable text buffer, its cursor, its selection, and its viewport.
pub struct Document {
    lines: SlotMap<LineKey, LineNode>,
    first: LineKey,
    last: LineKey,
    cur: LineKey,
    top: LineKey,
    top_line_num: usize,
    line_count: usize,

    cursor: Cursor,

    selected: bool,
    selection: Selection,
    old_cur_line_num: usize,
    old_cursor_x: usize,

    w: i32,
    h: i32,
    char_w: i32,
    char_h: i32,
    scroll_x: i32,
    scroll_y: i32,
    tab_size: usize,

    edited: bool,
    edited_updater: Option<Box<dyn FnMut(bool)>>,
    pos_updater: Option<Box<dyn FnMut(usize, usize)>>,
}

fn indent_length(line: &Line) -> usize {
    let chars = line.chars();
    let mut i = 0;
    while i != chars.len() && chars[i] <= ' ' {
        i += 1;
    }
    i
}

fn split_trailing_whitespace(s: &[char]) -> (Vec<char>, Vec<char>) {
    let mut i = s.len();
    while i != 0 && s[i - 1] <= ' ' {
        i -= 1;
    }
    (s[..i].to_vec(), s[i..].to_vec())
}

impl Document {
    pub fn new(w: i32, h: i32, char_w: i32, char_h: i32) -> Self {
        let mut lines = SlotMap::with_key();
        let key = lines.insert(LineNode {
            prev: None,
            next: None,
            line: Line::new(),
        });
        let mut doc = Document {
            lines,
            first: key,
            last: key,
            cur: key,
            top: key,
            top_line_num: 1,
            line_count: 1,
            cursor: Cursor::new(),
            selected: false,
            selection: Selection::new(0, 0, 0, 0),
            old_cur_line_num: 1,
            old_cursor_x: 0,
            w: 0,
            h: 0,
            char_w: 0,
            char_h: 0,
            scroll_x: 0,
            scroll_y: 0,
            tab_size: 4,
            edited: false,
            edited_updater: None,
            pos_updater: None,
        };
        doc.resize(w, h);
        doc.set_font_size(char_w, char_h);
        doc
    }

    pub fn set_updaters(
        &mut self,
        edited_updater: impl FnMut(bool) + 'static,
        pos_updater: impl FnMut(usize, usize) + 'static,
    ) {
        self.edited_updater = Some(Box::new(edited_updater));
        self.pos_updater = Some(Box::new(pos_updater));
    }

    fn update_pos(&mut self) {
        if let Some(updater) = self.pos_updater.as_mut() {
            updater(self.cursor.line, self.cursor.col + 1);
        }
    }

    fn set_edited(&mut self, edited: bool) {
        if self.edited != edited {
            self.edited = edited;
            if let Some(updater) = self.edited_updater.as_mut() {
                updater(self.edited);
            }
        }
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selected.then_some(self.selection)
    }

    pub fn reader(&self) -> Reader {
        Reader::new(self)
    }

    fn node(&self, key: LineKey) -> &LineNode {
        &self.lines[key]
    }

    fn node_mut(&mut self, key: LineKey) -> &mut LineNode {
        &mut self.lines[key]
    }

    pub fn line(&self, key: LineKey) -> &Line {
        &self.node(key).line
    }

    fn line_mut(&mut self, key: LineKey) -> &mut Line {
        &mut self.node_mut(key).line
    }

    pub fn next_line_key(&self, key: LineKey) -> Option<LineKey> {
        self.node(key).next
    }

    pub fn cur_line(&self) -> &Line {
        self.line(self.cur)
    }

    fn cur_line_mut(&mut self) -> &mut Line {
        let key = self.cur;
        self.line_mut(key)
    }

    pub fn cur_line_num(&self) -> usize {
        self.cursor.line
    }

    /// Returns the line with 1-based number `line_num`, and the number that
    /// was actually reached (clamped to the first/last line, as the
    /// original's `LineByNum` does).
    pub fn line_by_num(&self, line_num: usize) -> (LineKey, usize) {
        let mut key = self.first;
        let mut corrected = 1;
        if line_num > 0 {
            while self.node(key).next.is_some() && corrected != line_num {
                key = self.node(key).next.unwrap();
                corrected += 1;
            }
        }
        (key, corrected)
    }

    pub fn set_cur_line(&mut self, key: LineKey, line_num: usize) {
        self.cur = key;
        self.cursor.line = line_num;
        self.cursor.col = 0;
        self.update_cursor_mem();
        self.move_to_cursor();
        self.update_pos();
    }

    pub fn top_line(&self) -> (&Line, usize) {
        (self.line(self.top), self.top_line_num)
    }

    pub fn top_line_key(&self) -> LineKey {
        self.top
    }

    pub fn top_line_num(&self) -> usize {
        self.top_line_num
    }

    pub fn cursor_x(&self) -> usize {
        self.cursor.col
    }

    pub fn set_cursor_x(&mut self, x: usize) {
        let n = self.cur_line().len();
        self.cursor.col = x.min(n);
        self.update_cursor_mem();
        self.update_pos();
    }

    pub fn resize(&mut self, w: i32, h: i32) {
        self.w = w;
        self.h = h;
    }

    pub fn set_font_size(&mut self, char_w: i32, char_h: i32) {
        self.char_w = char_w;
        self.char_h = char_h;
    }

    pub fn set_tab_size(&mut self, tab_size: usize) {
        self.tab_size = tab_size;
    }

    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    pub fn scroll_values(&self) -> (i32, i32) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        let key = self.lines.insert(LineNode {
            prev: None,
            next: None,
            line: Line::new(),
        });
        self.first = key;
        self.last = key;
        self.cur = key;
        self.top = key;
        self.top_line_num = 1;
        self.line_count = 1;
        self.cursor = Cursor::new();
        self.selected = false;
        self.selection = Selection::new(0, 0, 0, 0);
        self.old_cur_line_num = 1;
        self.old_cursor_x = 0;
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.set_edited(false);
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), String> {
        self.clear();
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("open file: {}", e))?;
        self.load(&contents);
        self.set_edited(false);
        Ok(())
    }

    /// Drives the file scanner, re-building the line list and applying each
    /// line's trailing color code. Mirrors `TextImpl.load` — in particular,
    /// the color code is applied to the line that was just completed,
    /// *after* `HandleEnter` has already advanced `cur` past it (see
    /// SPEC_FULL.md §9(b)).
    fn load(&mut self, text: &str) {
        let mut scanner = file_scanner::Scanner::new(text);
        let mut tok = scanner.scan();
        while tok != Token::Eot {
            let mut to_append: Vec<char> = Vec::new();
            if let Token::String(s) = &tok {
                to_append = s.clone();
                tok = scanner.scan();
            }

            if tok == Token::ColorMarker {
                let (body, spaces) = split_trailing_whitespace(&to_append);
                to_append = body;
                self.cur_line_mut().set_spaces(spaces);
                tok = scanner.scan();

                let mut code: Vec<char> = Vec::new();
                while tok != Token::Eot && !matches!(tok, Token::NewLine(_)) {
                    match &tok {
                        Token::String(s) => code.extend_from_slice(s),
                        Token::ColorMarker => code.extend_from_slice(&['/', '/', '/']),
                        _ => {}
                    }
                    tok = scanner.scan();
                }
                self.cur_line_mut().set_color_code(code);
            }

            for ch in to_append {
                self.handle_char(ch);
            }

            let finished_key = self.cur;

            if let Token::NewLine(kind) = tok {
                self.line_mut(finished_key).newline_type = kind;
                self.handle_enter();
                tok = scanner.scan();
            }

            self.line_mut(finished_key).apply_color_code();
        }
        self.move_to_beginning();
    }

    pub fn save_to_file(&mut self, path: &Path) -> Result<(), String> {
        let contents = self.write();
        std::fs::write(path, contents).map_err(|e| format!("write file: {}", e))?;
        self.set_edited(false);
        Ok(())
    }

    fn write(&self) -> String {
        let mut out = String::new();
        let mut key = Some(self.first);
        while let Some(k) = key {
            self.write_line(self.line(k), &mut out);
            key = self.node(k).next;
        }
        out
    }

    fn write_line(&self, line: &Line, out: &mut String) {
        for &c in line.chars() {
            out.push(c);
        }
        if line.is_colorized() {
            if !line.spaces().is_empty() {
                for &c in line.spaces() {
                    out.push(c);
                }
            } else {
                out.push_str("\t\t");
            }
            out.push_str("///");
            out.push_str(&line.encode_color_code());
        }
        out.push_str(line.newline_type.as_str());
    }

    pub fn update_cursor_mem(&mut self) {
        let x = self.cursor.col;
        let visual = self.cursor_x_to_visual(self.cur_line(), x);
        self.cursor.mem = visual;
    }

    pub fn handle_escape(&mut self) {
        self.clear_selection();
    }

    pub fn handle_delete(&mut self) {
        if self.selected {
            self.delete_selected_text();
        } else {
            self.clear_selection();
            let len = self.cur_line().len();
            if self.cursor.col != len {
                let pos = self.cursor.col;
                self.cur_line_mut().delete_char(pos);
                self.set_edited(true);
            } else if self.node(self.cur).next.is_some() {
                let dx = len;
                self.handle_right(false);
                let orig = self
                    .node(self.cur)
                    .prev
                    .expect("moving right onto a next line always leaves a predecessor");
                self.merge_lines(orig);
                self.cursor.col = dx;
                self.set_edited(true);
            }
            self.update_cursor_mem();
        }
    }

    pub fn handle_backspace(&mut self) {
        if self.selected {
            self.delete_selected_text();
        } else {
            self.clear_selection();
            if self.cursor.col != 0 {
                let pos = self.cursor.col - 1;
                self.cur_line_mut().delete_char(pos);
                self.cursor.col -= 1;
                self.set_edited(true);
            } else if let Some(prev) = self.node(self.cur).prev {
                let dx = self.line(prev).len();
                self.merge_lines(prev);
                self.cursor.col = dx;
                self.set_edited(true);
            }
            self.update_cursor_mem();
        }
    }

    /// Whether character `char_num` on line `line_num` is selected.
    /// `char_num == None` asks about the newline immediately preceding
    /// `line_num` — the Rust rendering of the original's `charNum == -1`
    /// convention, which is only ever true for lines past the first one in
    /// a multi-line selection.
    pub fn in_selection(&self, line_num: usize, char_num: Option<usize>) -> bool {
        if !self.selected {
            return false;
        }
        let sel = &self.selection;
        if line_num < sel.line_from || line_num > sel.line_to {
            return false;
        }
        if sel.line_from < line_num && line_num < sel.line_to {
            return true;
        }
        if line_num == sel.line_from && line_num == sel.line_to {
            return match char_num {
                Some(c) => c >= sel.char_from && c < sel.char_to,
                None => false,
            };
        }
        if line_num == sel.line_from {
            return match char_num {
                Some(c) => c >= sel.char_from,
                None => false,
            };
        }
        match char_num {
            Some(c) => c < sel.char_to,
            None => true,
        }
    }

    fn was_left_selection_edge(&self) -> bool {
        self.old_cur_line_num == self.selection.line_from && self.old_cursor_x == self.selection.char_from
    }

    pub fn clear_selection(&mut self) {
        self.selected = false;
    }

    pub fn delete_selected_text(&mut self) {
        if !self.selected {
            return;
        }
        let sel = self.selection;
        let (key, mut line_num) = self.line_by_num(sel.line_from);
        if sel.line_from == sel.line_to {
            self.line_mut(key).delete_range(sel.char_from, sel.char_to);
            self.set_cursor_x(sel.char_from);
        } else {
            let next = self.node(key).next;
            if sel.char_from == 0 {
                self.delete_line(key);
            } else {
                let len = self.line(key).len();
                self.line_mut(key).delete_range(sel.char_from, len + 1);
                self.set_cur_line(key, line_num);
                self.set_cursor_x(sel.char_from);
            }
            line_num += 1;
            let mut cur_key = next.expect("a multi-line selection always has a next line");
            while line_num != sel.line_to {
                let next2 = self.node(cur_key).next;
                self.delete_line(cur_key);
                line_num += 1;
                cur_key = next2.expect("line_to was not reached before running out of lines");
            }
            self.line_mut(cur_key).delete_range(0, sel.char_to);
            if sel.char_from == 0 {
                self.set_cur_line(cur_key, sel.line_from);
                self.set_cursor_x(0);
            } else {
                let prev = self
                    .node(cur_key)
                    .prev
                    .expect("the last line of a multi-line selection has a predecessor");
                self.merge_lines(prev);
            }
        }
        self.selected = false;
        self.set_edited(true);
    }

    pub fn set_selection(&mut self, line_from: usize, char_from: usize, line_to: usize, char_to: usize) {
        self.selected = true;
        self.selection = Selection::new(line_from, char_from, line_to, char_to);
        self.normalize_selection();
    }

    fn normalize_selection(&mut self) {
        if self.selection.is_empty() {
            self.clear_selection();
        } else if self.selection.is_inverted() {
            self.selection.normalize();
        }
    }

    fn selection_before(&mut self) {
        self.old_cur_line_num = self.cursor.line;
        self.old_cursor_x = self.cursor.col;
    }

    fn selection_after(&mut self, shift: bool) {
        if !shift {
            self.clear_selection();
        } else if !self.selected {
            self.set_selection(self.old_cur_line_num, self.old_cursor_x, self.cursor.line, self.cursor.col);
        } else if self.was_left_selection_edge() {
            let (line_to, char_to) = (self.selection.line_to, self.selection.char_to);
            self.set_selection(self.cursor.line, self.cursor.col, line_to, char_to);
        } else {
            let (line_from, char_from) = (self.selection.line_from, self.selection.char_from);
            self.set_selection(line_from, char_from, self.cursor.line, self.cursor.col);
        }
        self.move_to_cursor();
        self.update_pos();
    }

    fn cursor_too_low(&self) -> bool {
        self.cursor.line as i32 * self.char_h > self.scroll_y + self.h
    }

    fn cursor_too_high(&self) -> bool {
        (self.cursor.line as i32 - 1) * self.char_h < self.scroll_y
    }

    fn move_to_cursor(&mut self) {
        if self.cursor_too_low() {
            self.scroll_y = self.cursor.line as i32 * self.char_h - self.h;
        } else if self.cursor_too_high() {
            self.scroll_y = (self.cursor.line as i32 - 1) * self.char_h;
        }
    }

    pub fn scroll_delta(&mut self, dy: i32) {
        self.scroll_y += dy;
        let max = self.line_count as i32 * self.char_h - self.h;
        if self.scroll_y > max {
            self.scroll_y = max;
        }
        if self.scroll_y < 0 {
            self.scroll_y = 0;
        }
    }

    pub fn move_to_beginning(&mut self) {
        self.cur = self.first;
        self.cursor.line = 1;
        self.cursor.col = 0;
        self.update_cursor_mem();
        self.move_to_cursor();
        self.update_pos();
    }

    pub fn start_mouse_selection(&mut self) {
        self.clear_selection();
        self.selection_before();
    }

    pub fn continue_mouse_selection(&mut self) {
        self.selection_after(true);
        self.selection_before();
    }

    pub fn handle_enter(&mut self) {
        self.clear_selection();
        let x = self.cursor.col;
        self.split_line(self.cur, x);
        self.cur = self.node(self.cur).next.expect("split_line always links a next line");
        self.cursor.line += 1;
        self.cursor.col = 0;
        self.update_cursor_mem();
        self.move_to_cursor();
        self.set_edited(true);
    }

    pub fn handle_home(&mut self, shift: bool) {
        self.selection_before();
        let indent = indent_length(self.cur_line());
        self.cursor.col = if self.cursor.col > indent { indent } else { 0 };
        self.update_cursor_mem();
        self.selection_after(shift);
    }

    pub fn handle_end(&mut self, shift: bool) {
        self.selection_before();
        self.cursor.col = self.cur_line().len();
        self.update_cursor_mem();
        self.selection_after(shift);
    }

    pub fn handle_left(&mut self, shift: bool) {
        self.selection_before();
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        } else if let Some(prev) = self.node(self.cur).prev {
            self.cursor.line -= 1;
            self.cur = prev;
            self.cursor.col = self.line(prev).len();
        }
        self.update_cursor_mem();
        self.selection_after(shift);
    }

    pub fn handle_right(&mut self, shift: bool) {
        self.selection_before();
        let len = self.cur_line().len();
        if self.cursor.col < len {
            self.cursor.col += 1;
        } else if let Some(next) = self.node(self.cur).next {
            self.cursor.line += 1;
            self.cur = next;
            self.cursor.col = 0;
        }
        self.update_cursor_mem();
        self.selection_after(shift);
    }

    pub fn handle_up(&mut self, shift: bool) {
        self.selection_before();
        if let Some(prev) = self.node(self.cur).prev {
            self.cursor.line -= 1;
            self.cur = prev;
            let mem = self.cursor.mem;
            let mut x = self.visual_to_cursor_x(self.line(prev), mem);
            let len = self.line(prev).len();
            if x > len {
                x = len;
            }
            self.cursor.col = x;
        } else {
            self.cursor.col = 0;
        }
        self.selection_after(shift);
    }

    pub fn handle_down(&mut self, shift: bool) {
        self.selection_before();
        if let Some(next) = self.node(self.cur).next {
            self.cursor.line += 1;
            self.cur = next;
            let mem = self.cursor.mem;
            let mut x = self.visual_to_cursor_x(self.line(next), mem);
            let len = self.line(next).len();
            if x > len {
                x = len;
            }
            self.cursor.col = x;
        } else {
            self.cursor.col = self.cur_line().len();
        }
        self.selection_after(shift);
    }

    /// Recomputes `x`, a visual column, as a character offset into `line` —
    /// tab-aware, and approximating a click in the middle of a multi-column
    /// tab cell as belonging to whichever half it falls in.
    pub fn visual_to_cursor_x(&self, line: &Line, x: usize) -> usize {
        let tab_size = self.tab_size;
        let chars = line.chars();
        let mut old_visual_x = 0usize;
        let mut visual_x = 0usize;
        let mut i = 0usize;
        while i != chars.len() && visual_x < x {
            let char_count = if chars[i] == '\t' {
                tab_size - visual_x % tab_size
            } else {
                1
            };
            old_visual_x = visual_x;
            visual_x += char_count;
            i += 1;
        }

        let diff = visual_x - old_visual_x;
        if diff > 1 && x <= old_visual_x + diff / 2 {
            i -= 1;
        }
        i
    }

    /// Recomputes character offset `x` into `line` as a visual column.
    pub fn cursor_x_to_visual(&self, line: &Line, x: usize) -> usize {
        let tab_size = self.tab_size;
        let chars = line.chars();
        let x = x.min(chars.len());
        let mut visual_x = 0usize;
        let mut i = 0usize;
        while i != x {
            let char_count = if chars[i] == '\t' {
                tab_size - visual_x % tab_size
            } else {
                1
            };
            visual_x += char_count;
            i += 1;
        }
        visual_x
    }

    pub fn handle_page_up(&mut self, shift: bool) {
        self.selection_before();

        let mut lines = self.h / self.char_h;
        if lines == 0 {
            lines = 1;
        }

        while let Some(prev) = self.node(self.cur).prev {
            if lines == 0 {
                break;
            }
            self.cursor.line -= 1;
            self.cur = prev;
            self.scroll_y -= self.char_h;
            lines -= 1;
        }

        if self.scroll_y < 0 {
            self.scroll_y = 0;
        }

        if lines == 0 {
            let mem = self.cursor.mem;
            let mut x = self.visual_to_cursor_x(self.cur_line(), mem);
            let len = self.cur_line().len();
            if x > len {
                x = len;
            }
            self.cursor.col = x;
        } else {
            self.cursor.col = 0;
        }

        self.selection_after(shift);
    }

    pub fn handle_page_down(&mut self, shift: bool) {
        self.selection_before();

        let mut lines = self.h / self.char_h;
        if lines == 0 {
            lines = 1;
        }

        while let Some(next) = self.node(self.cur).next {
            if lines == 0 {
                break;
            }
            self.cursor.line += 1;
            self.cur = next;
            self.scroll_y += self.char_h;
            lines -= 1;
        }

        if lines == 0 {
            let mem = self.cursor.mem;
            let mut x = self.visual_to_cursor_x(self.cur_line(), mem);
            let len = self.cur_line().len();
            if x > len {
                x = len;
            }
            self.cursor.col = x;
        } else {
            self.cursor.col = self.cur_line().len();
        }

        self.selection_after(shift);
    }

    pub fn handle_char(&mut self, ch: char) {
        self.selection_before();
        self.delete_selected_text();
        let pos = self.cursor.col;
        self.cur_line_mut().insert_char(pos, ch);
        self.cursor.col += 1;
        self.update_cursor_mem();
        self.selection_after(false);
        self.set_edited(true);
    }

    pub fn handle_cut(&mut self, clipboard: &mut dyn ClipboardProvider) {
        self.handle_copy(clipboard);
        self.delete_selected_text();
    }

    pub fn handle_copy(&mut self, clipboard: &mut dyn ClipboardProvider) {
        let text = self.selected_text();
        let _ = clipboard.set_contents(text);
    }

    pub fn handle_paste(&mut self, clipboard: &mut dyn ClipboardProvider) {
        if let Ok(text) = clipboard.get_contents() {
            self.delete_selected_text();
            self.insert_text(&text);
        }
    }

    pub fn handle_select_all(&mut self) {
        let last_len = self.line(self.last).len();
        self.set_selection(1, 0, self.line_count, last_len);
    }

    pub fn selected_text(&self) -> String {
        let mut out = String::new();
        if !self.selected {
            return out;
        }
        let sel = self.selection;
        let (key, mut line_num) = self.line_by_num(sel.line_from);
        if sel.line_from == sel.line_to {
            out.push_str(&self.line(key).string_range(sel.char_from, sel.char_to));
        } else {
            let line = self.line(key);
            out.push_str(&line.string_range(sel.char_from, line.len()));
            out.push_str(line.newline_type.as_str());
            line_num += 1;
            let mut cur_key = self.node(key).next.expect("a multi-line selection always has a next line");
            while line_num != sel.line_to {
                let line = self.line(cur_key);
                out.push_str(&line.string_range(0, line.len()));
                out.push_str(line.newline_type.as_str());
                line_num += 1;
                cur_key = self
                    .node(cur_key)
                    .next
                    .expect("line_to was not reached before running out of lines");
            }
            let line = self.line(cur_key);
            out.push_str(&line.string_range(0, sel.char_to));
        }
        out
    }

    pub fn insert_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.handle_enter();
            } else if ch != '\r' {
                self.handle_char(ch);
            }
        }
        self.set_edited(true);
    }

    pub fn colorize_selection(&mut self, color: u8) {
        if !self.selected {
            return;
        }
        let sel = self.selection;
        let (key, mut line_num) = self.line_by_num(sel.line_from);
        if sel.line_from == sel.line_to {
            self.line_mut(key).colorize(color, sel.char_from, sel.char_to);
        } else {
            let len = self.line(key).len();
            self.line_mut(key).colorize(color, sel.char_from, len + 1);
            line_num += 1;
            let mut cur_key = self.node(key).next.expect("a multi-line selection always has a next line");
            while line_num != sel.line_to {
                let len = self.line(cur_key).len();
                self.line_mut(cur_key).colorize(color, 0, len + 1);
                line_num += 1;
                cur_key = self
                    .node(cur_key)
                    .next
                    .expect("line_to was not reached before running out of lines");
            }
            self.line_mut(cur_key).colorize(color, 0, sel.char_to);
        }
    }

    /// Splits line `key` at character offset `x`, inserting the new tail
    /// line immediately after it.
    fn split_line(&mut self, key: LineKey, x: usize) {
        let prev_last_run_color = self.node(key).prev.map(|p| self.line(p).last_run_color());
        let new_line = self.line_mut(key).split(x, prev_last_run_color);

        let next = self.node(key).next;
        let new_key = self.lines.insert(LineNode {
            prev: Some(key),
            next,
            line: new_line,
        });
        if let Some(next_key) = next {
            self.node_mut(next_key).prev = Some(new_key);
        }
        self.node_mut(key).next = Some(new_key);
        if key == self.last {
            self.last = new_key;
        }
        self.line_count += 1;
    }

    /// Merges line `key` with the line after it, appending the latter's
    /// contents onto `key` and removing it from the arena.
    pub fn merge_lines(&mut self, key: LineKey) {
        let next_key = match self.node(key).next {
            Some(k) => k,
            None => return,
        };
        let next_line = self.node(next_key).line.clone();
        self.line_mut(key).merge(next_line);
        self.delete_line(next_key);
    }

    /// Removes `key` from the line list, unless it is the document's only
    /// line. Repoints `first`/`last`/`top`/`cur` as needed.
    pub fn delete_line(&mut self, key: LineKey) {
        let prev = self.node(key).prev;
        let next = self.node(key).next;
        if prev.is_none() && next.is_none() {
            return;
        }

        if let Some(p) = prev {
            self.node_mut(p).next = next;
        } else {
            self.first = next.expect("a line with neither prev nor next would have returned above");
        }
        if let Some(n) = next {
            self.node_mut(n).prev = prev;
        } else {
            self.last = prev.expect("symmetric to the first-line case above");
        }

        if key == self.top {
            self.top = prev.unwrap_or(self.first);
        }

        if key == self.cur {
            match prev {
                Some(p) => {
                    self.cur = p;
                    self.cursor.line -= 1;
                }
                None => {
                    self.cur = self.first;
                    self.cursor.line = 1;
                }
            }
            self.cursor.col = 0;
            self.update_cursor_mem();
        }

        self.lines.remove(key);
        self.line_count -= 1;
        self.scroll_delta(0);
        self.move_to_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::MemoryClipboard;
    use crate::core::line::Run;

    #[test]
    fn typing_and_enter_builds_multiple_lines() {
        let mut doc = Document::new(80, 24, 8, 16);
        doc.handle_char('a');
        doc.handle_char('b');
        assert_eq!(doc.cur_line().chars(), &['a', 'b']);
        doc.handle_enter();
        doc.handle_char('c');
        assert_eq!(doc.cur_line_num(), 2);
        assert_eq!(doc.cur_line().chars(), &['c']);
        assert_eq!(doc.line_count(), 2);
    }

    #[test]
    fn backspace_at_line_start_merges_with_previous_line() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "ab".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "cd".chars() {
            doc.handle_char(c);
        }
        assert_eq!(doc.line_count(), 2);

        doc.set_cursor_x(0);
        doc.handle_backspace();

        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.cur_line().chars(), &['a', 'b', 'c', 'd']);
        assert_eq!(doc.cursor_x(), 2);
    }

    #[test]
    fn delete_at_line_end_merges_with_next_line() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "ab".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "cd".chars() {
            doc.handle_char(c);
        }

        let (first_key, first_num) = doc.line_by_num(1);
        doc.set_cur_line(first_key, first_num);
        doc.set_cursor_x(2);
        doc.handle_delete();

        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.cur_line().chars(), &['a', 'b', 'c', 'd']);
        assert_eq!(doc.cursor_x(), 2);
    }

    #[test]
    fn multi_line_selection_delete_joins_the_boundary_lines() {
        // "AAA" / "BBB" / "CCC"; select (1,1)-(3,2) deletes the tail of
        // line 1, the whole middle line, and the head of line 3, then
        // merges what remains of the first and last lines.
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "AAA".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "BBB".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "CCC".chars() {
            doc.handle_char(c);
        }

        doc.set_selection(1, 1, 3, 2);
        doc.delete_selected_text();

        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.cur_line().chars(), &['A', 'C']);
        assert_eq!(doc.cur_line_num(), 1);
        assert_eq!(doc.cursor_x(), 1);
    }

    #[test]
    fn colorize_selection_delegates_to_the_underlying_line() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "HelloWorld".chars() {
            doc.handle_char(c);
        }
        doc.set_selection(1, 5, 1, 8);
        doc.colorize_selection(3);
        assert_eq!(doc.cur_line().encode_color_code(), "5 3b");
    }

    #[test]
    fn load_then_save_reproduces_the_source_body_and_color_code() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("chromaline_doc_test_{}.txt", std::process::id()));
        std::fs::write(&path, "ab\t\t///2R\n").unwrap();

        let mut doc = Document::new(80, 24, 8, 16);
        doc.load_from_file(&path).unwrap();

        let (first_key, _) = doc.line_by_num(1);
        let first = doc.line(first_key);
        assert_eq!(first.chars(), &['a', 'b']);
        assert_eq!(first.spaces(), &['\t', '\t']);
        assert_eq!(
            first.runs(),
            &[Run { length: 2, color: 5 }, Run { length: 1, color: 0 }]
        );

        doc.save_to_file(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        // A terminating newline in the source always produces one extra
        // empty trailing line, inherited unchanged from the original
        // loader (see DESIGN.md) — save is therefore not byte-identical
        // for files ending in a newline.
        assert_eq!(saved, "ab\t\t///2R\n\n");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn visual_to_cursor_x_splits_tab_cell_at_midpoint() {
        let doc = Document::new(80, 24, 8, 16);
        let mut line = Line::new();
        line.insert_char(0, '\t');
        line.insert_char(1, 'X');
        assert_eq!(doc.visual_to_cursor_x(&line, 2), 0);
        assert_eq!(doc.visual_to_cursor_x(&line, 3), 1);
    }

    #[test]
    fn vertical_motion_remembers_column_through_a_short_line() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "Hello".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "Hi".chars() {
            doc.handle_char(c);
        }

        let (first_key, first_num) = doc.line_by_num(1);
        doc.set_cur_line(first_key, first_num);
        doc.handle_end(false);

        doc.handle_down(false);
        assert_eq!(doc.cur_line_num(), 2);
        assert_eq!(doc.cursor_x(), 2);

        doc.handle_up(false);
        assert_eq!(doc.cur_line_num(), 1);
        assert_eq!(doc.cursor_x(), 5);
    }

    #[test]
    fn paste_splits_on_newlines_and_ignores_carriage_returns() {
        let mut doc = Document::new(80, 24, 8, 16);
        let mut clip = MemoryClipboard::default();
        clip.set_contents("X\r\nY\nZ".to_string()).unwrap();

        doc.handle_paste(&mut clip);

        assert!(doc.is_edited());
        assert_eq!(doc.line_count(), 3);
        let (l1, _) = doc.line_by_num(1);
        let (l2, _) = doc.line_by_num(2);
        let (l3, _) = doc.line_by_num(3);
        assert_eq!(doc.line(l1).chars(), &['X']);
        assert_eq!(doc.line(l2).chars(), &['Y']);
        assert_eq!(doc.line(l3).chars(), &['Z']);
    }

    #[test]
    fn select_all_spans_from_document_start_to_last_line_end() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "ab".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "cde".chars() {
            doc.handle_char(c);
        }
        doc.handle_select_all();
        let sel = doc.selection().unwrap();
        assert_eq!(sel.line_from, 1);
        assert_eq!(sel.char_from, 0);
        assert_eq!(sel.line_to, 2);
        assert_eq!(sel.char_to, 3);
    }

    #[test]
    fn escape_clears_an_active_selection() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "abcd".chars() {
            doc.handle_char(c);
        }
        doc.set_selection(1, 0, 1, 2);
        assert!(doc.selection().is_some());
        doc.handle_escape();
        assert!(doc.selection().is_none());
    }

    #[test]
    fn backspace_at_document_start_is_a_no_op() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "ab".chars() {
            doc.handle_char(c);
        }
        doc.set_cursor_x(0);
        doc.handle_backspace();
        assert_eq!(doc.cur_line().chars(), &['a', 'b']);
        assert_eq!(doc.cursor_x(), 0);
        assert_eq!(doc.line_count(), 1);
    }

    #[test]
    fn delete_at_document_end_is_a_no_op() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "ab".chars() {
            doc.handle_char(c);
        }
        doc.handle_delete();
        assert_eq!(doc.cur_line().chars(), &['a', 'b']);
        assert_eq!(doc.cursor_x(), 2);
        assert_eq!(doc.line_count(), 1);
    }

    #[test]
    fn page_down_past_the_last_line_clamps_at_document_end() {
        let mut doc = Document::new(40, 20, 8, 4);
        for c in "first".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "second".chars() {
            doc.handle_char(c);
        }
        doc.handle_page_down(false);
        assert_eq!(doc.cur_line_num(), doc.line_count());
        assert_eq!(doc.cursor_x(), doc.cur_line().len());
    }

    #[test]
    fn tab_aware_horizontal_and_vertical_motion_tracks_visual_column() {
        // Line 1 "\tX" with tab_size=4: col 0 is visual 0, col 1 (past the
        // tab) is visual 4, col 2 (past the X, end of line) is visual 5.
        // Line 2 is the shorter "Y". Moving right twice on line 1 reaches
        // visual column 5; moving down clamps onto line 2's single
        // character without touching the remembered visual column; moving
        // back up recovers visual column 5 on line 1, i.e. its end.
        let mut doc = Document::new(80, 24, 8, 16);
        doc.handle_char('\t');
        doc.handle_char('X');
        doc.handle_enter();
        doc.handle_char('Y');

        let (first_key, first_num) = doc.line_by_num(1);
        doc.set_cur_line(first_key, first_num);
        doc.set_cursor_x(0);

        doc.handle_right(false);
        assert_eq!(doc.cursor_x(), 1);
        assert_eq!(doc.cursor().mem, 4);

        doc.handle_right(false);
        assert_eq!(doc.cursor_x(), 2);
        assert_eq!(doc.cursor().mem, 5);

        doc.handle_down(false);
        assert_eq!(doc.cur_line_num(), 2);
        assert_eq!(doc.cursor_x(), 1);
        assert_eq!(doc.cursor().mem, 5);

        doc.handle_up(false);
        assert_eq!(doc.cur_line_num(), 1);
        assert_eq!(doc.cursor_x(), 2);
        assert_eq!(doc.cursor().mem, 5);
    }

    #[test]
    fn colorizing_across_a_newline_marks_the_intermediate_line_for_full_row_fill() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "AAA".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        for c in "BBB".chars() {
            doc.handle_char(c);
        }
        doc.set_selection(1, 1, 2, 2);
        doc.colorize_selection(5);

        let mut reader = doc.reader();
        reader.top_line(&doc);
        reader.first_char(&doc);
        while reader.next_char(&doc).is_some() {}
        assert_eq!(
            reader.should_paint_full_line(&doc),
            Some(crate::core::palette::lookup(5).bg.unwrap())
        );
    }

    #[test]
    fn clear_resets_to_a_single_empty_line() {
        let mut doc = Document::new(80, 24, 8, 16);
        for c in "abcd".chars() {
            doc.handle_char(c);
        }
        doc.handle_enter();
        doc.clear();
        assert_eq!(doc.line_count(), 1);
        assert!(doc.cur_line().is_empty());
        assert!(!doc.is_edited());
        assert_eq!(doc.cur_line_num(), 1);
        assert_eq!(doc.cursor_x(), 0);
    }
}
