//! The terminal consumer: owns the event loop, the clipboard provider, and
//! the file-open CLI argument, and turns [`Reader`] output plus
//! `in_selection` queries into styled terminal cells.
//!
//! Grounded on `tui_main.rs`'s `run`/`event_loop`/`draw_frame` shape, cut
//! down to the one window this crate's document model actually has (no
//! tabs, no sidebar, no LSP popups).

use std::io::{self, Stdout};
use std::path::PathBuf;

use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::Rect;
use ratatui::style::Color as RColor;
use ratatui::Terminal;

use chromaline_core::core::clipboard::ClipboardProvider as CoreClipboardProvider;
use chromaline_core::core::document::Document;
use chromaline_core::core::palette::Color as PaletteColor;

const SELECTION_BG: PaletteColor = PaletteColor { r: 76, g: 127, b: 178 };
const STATUS_FG: RColor = RColor::Rgb(220, 220, 220);
const STATUS_BG: RColor = RColor::Rgb(40, 40, 40);

use copypasta_ext::prelude::{ClipboardContext, ClipboardProvider as SysClipboardProvider};

/// Adapts the system clipboard (via `copypasta-ext`) to the core's
/// [`CoreClipboardProvider`] trait. The only `copypasta-ext` import in this
/// crate — `core` never depends on it directly.
struct SystemClipboard {
    inner: ClipboardContext,
}

impl SystemClipboard {
    fn new() -> Result<Self, String> {
        let inner = ClipboardContext::new().map_err(|e| format!("clipboard init: {}", e))?;
        Ok(Self { inner })
    }
}

impl CoreClipboardProvider for SystemClipboard {
    fn set_contents(&mut self, text: String) -> Result<(), String> {
        self.inner.set_contents(text).map_err(|e| format!("clipboard set: {}", e))
    }

    fn get_contents(&mut self) -> Result<String, String> {
        self.inner.get_contents().map_err(|e| format!("clipboard get: {}", e))
    }
}

fn rc(c: PaletteColor) -> RColor {
    RColor::Rgb(c.r, c.g, c.b)
}

pub fn run(file_path: Option<PathBuf>) {
    let mut doc = Document::new(80, 24, 1, 1);
    if let Some(path) = &file_path {
        if let Err(e) = doc.load_from_file(path) {
            eprintln!("chromaline: {}", e);
        }
    }

    let mut clipboard = match SystemClipboard::new() {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("chromaline: {}. Cut/copy/paste will be unavailable.", e);
            None
        }
    };

    enable_raw_mode().expect("enable raw mode");
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).expect("enter alternate screen");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).expect("create terminal");
    terminal.clear().expect("clear terminal");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        event_loop(&mut terminal, &mut doc, &mut clipboard, file_path.as_deref());
    }));

    restore_terminal(&mut terminal);

    if let Err(e) = result {
        std::panic::resume_unwind(e);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    doc: &mut Document,
    clipboard: &mut Option<SystemClipboard>,
    file_path: Option<&std::path::Path>,
) {
    let mut status_message: Option<String> = None;

    loop {
        let size = terminal.size().expect("terminal size");
        let char_h = 1;
        doc.set_font_size(1, char_h);
        doc.resize(size.width as i32, (size.height.saturating_sub(1)) as i32);

        terminal
            .draw(|frame| {
                let area = frame.area();
                let editor_area = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
                let status_area = Rect::new(area.x, area.y + editor_area.height, area.width, 1);
                draw_editor(frame.buffer_mut(), editor_area, doc);
                draw_status_line(frame.buffer_mut(), status_area, doc, file_path, status_message.as_deref());
            })
            .expect("draw frame");

        let ev = event::read().expect("read event");
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat => {
                let shift = key.modifiers.contains(KeyModifiers::SHIFT);
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

                match key.code {
                    KeyCode::Char('q') if ctrl => break,
                    KeyCode::Char('s') if ctrl => {
                        status_message = Some(match file_path {
                            Some(path) => match doc.save_to_file(path) {
                                Ok(()) => "saved".to_string(),
                                Err(e) => e,
                            },
                            None => "no file to save to".to_string(),
                        });
                    }
                    KeyCode::Char('x') if ctrl => {
                        if let Some(cb) = clipboard.as_mut() {
                            doc.handle_cut(cb);
                        }
                    }
                    KeyCode::Char('c') if ctrl => {
                        if let Some(cb) = clipboard.as_mut() {
                            doc.handle_copy(cb);
                        }
                    }
                    KeyCode::Char('v') if ctrl => {
                        if let Some(cb) = clipboard.as_mut() {
                            doc.handle_paste(cb);
                        }
                    }
                    KeyCode::Char('a') if ctrl => doc.handle_select_all(),
                    KeyCode::Char(c) if ctrl && c.is_ascii_digit() => {
                        doc.colorize_selection(c.to_digit(10).unwrap() as u8);
                    }
                    KeyCode::Left => doc.handle_left(shift),
                    KeyCode::Right => doc.handle_right(shift),
                    KeyCode::Up => doc.handle_up(shift),
                    KeyCode::Down => doc.handle_down(shift),
                    KeyCode::Home => doc.handle_home(shift),
                    KeyCode::End => doc.handle_end(shift),
                    KeyCode::PageUp => doc.handle_page_up(shift),
                    KeyCode::PageDown => doc.handle_page_down(shift),
                    KeyCode::Backspace => doc.handle_backspace(),
                    KeyCode::Delete => doc.handle_delete(),
                    KeyCode::Enter => doc.handle_enter(),
                    KeyCode::Tab => doc.handle_char('\t'),
                    KeyCode::Esc => doc.handle_escape(),
                    KeyCode::Char(c) => doc.handle_char(c),
                    _ => {}
                }
            }
            Event::Mouse(mouse) => {
                let row = mouse.row as usize;
                let col = mouse.column as usize;
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        click_at(doc, row, col);
                        doc.start_mouse_selection();
                    }
                    MouseEventKind::Drag(MouseButton::Left) => {
                        click_at(doc, row, col);
                        doc.continue_mouse_selection();
                    }
                    MouseEventKind::ScrollUp => doc.scroll_delta(-3),
                    MouseEventKind::ScrollDown => doc.scroll_delta(3),
                    _ => {}
                }
            }
            Event::Resize(_, _) => {}
            _ => {}
        }
    }
}

/// Moves the document's cursor to the line/column under a screen row/col,
/// without touching the selection — callers wrap this with
/// `start_mouse_selection`/`continue_mouse_selection`.
fn click_at(doc: &mut Document, row: usize, col: usize) {
    let (_, top_num) = doc.top_line();
    let mut key = doc.top_line_key();
    let mut line_num = top_num;
    for _ in 0..row {
        match doc.next_line_key(key) {
            Some(next) => {
                key = next;
                line_num += 1;
            }
            None => break,
        }
    }
    doc.set_cur_line(key, line_num);
    let x = doc.visual_to_cursor_x(doc.cur_line(), col);
    doc.set_cursor_x(x);
}

fn blend_selection(bg: Option<RColor>) -> RColor {
    match bg {
        Some(RColor::Rgb(r, g, b)) => {
            let sr = ((r as u16 + SELECTION_BG.r as u16) / 2) as u8;
            let sg = ((g as u16 + SELECTION_BG.g as u16) / 2) as u8;
            let sb = ((b as u16 + SELECTION_BG.b as u16) / 2) as u8;
            RColor::Rgb(sr, sg, sb)
        }
        _ => rc(SELECTION_BG),
    }
}

fn draw_editor(buf: &mut Buffer, area: Rect, doc: &Document) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let mut reader = doc.reader();
    let mut line_num = reader.top_line(doc);

    for row in 0..area.height {
        let y = area.y + row;
        let mut col = 0u16;

        let mut maybe_char = reader.first_char(doc);
        let mut char_idx = 0usize;
        while let Some(colored) = maybe_char {
            if col >= area.width {
                break;
            }
            let selected = doc.in_selection(line_num, Some(char_idx));
            let mut fg = rc(colored.fg);
            let mut bg = colored.bg.map(rc);
            if selected {
                fg = RColor::White;
                bg = Some(blend_selection(bg));
            }
            let x = area.x + col;
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(colored.ch);
                cell.set_fg(fg);
                if let Some(bg) = bg {
                    cell.set_bg(bg);
                }
            }
            col += 1;
            char_idx += 1;
            maybe_char = reader.next_char(doc);
        }

        let newline_selected = doc.in_selection(line_num + 1, None);
        let fill_bg = reader
            .should_paint_full_line(doc)
            .map(rc)
            .or(newline_selected.then(|| rc(SELECTION_BG)));
        if let Some(bg) = fill_bg {
            while col < area.width {
                let x = area.x + col;
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_bg(bg);
                }
                col += 1;
            }
        }

        match reader.next_line(doc) {
            Some(n) => line_num = n,
            None => break,
        }
    }
}

fn draw_status_line(
    buf: &mut Buffer,
    area: Rect,
    doc: &Document,
    file_path: Option<&std::path::Path>,
    message: Option<&str>,
) {
    if area.height == 0 {
        return;
    }
    let name = file_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "[No Name]".to_string());
    let edited = if doc.is_edited() { " [+]" } else { "" };
    let cursor = doc.cursor();
    let text = format!(
        "{}{}  Ln {}, Col {}{}",
        name,
        edited,
        cursor.line,
        doc.cursor_x() + 1,
        message.map(|m| format!("  — {}", m)).unwrap_or_default(),
    );
    for x in area.x..area.x + area.width {
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char(' ');
            cell.set_fg(STATUS_FG);
            cell.set_bg(STATUS_BG);
        }
    }
    for (i, ch) in text.chars().enumerate() {
        if i as u16 >= area.width {
            break;
        }
        let x = area.x + i as u16;
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char(ch);
            cell.set_fg(STATUS_FG);
            cell.set_bg(STATUS_BG);
        }
    }
}
