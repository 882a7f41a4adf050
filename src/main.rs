use std::path::PathBuf;

mod tui_app;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    chromaline_core::core::settings::Settings::ensure_exists().ok();

    let file_path = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from);

    tui_app::run(file_path);
}
