//! chromaline's editing core: the document model, its line/run storage, and
//! the streaming reader consumers use to render it. Free of any windowing,
//! terminal, or display-server dependency — see `core::clipboard` for how
//! the one genuinely external collaborator (the system clipboard) is kept
//! out of this crate.

pub mod core;
