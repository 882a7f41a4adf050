pub mod clipboard;
pub mod color_code;
pub mod cursor;
pub mod document;
pub mod file_scanner;
pub mod line;
pub mod palette;
pub mod reader;
pub mod selection;
pub mod settings;
pub mod syntax;

pub use clipboard::ClipboardProvider;
pub use cursor::Cursor;
pub use document::Document;
pub use line::{Line, NewLineType, Run};
pub use reader::{ColoredChar, Reader};
pub use selection::Selection;
