// Library exports for legaldoc

pub mod clipboard;
pub mod config;
pub mod content;
pub mod editor;
pub mod format;
pub mod history;
pub mod host;
pub mod keymap;
pub mod pipeline;
pub mod print_view;
pub mod richtext;
pub mod status;
pub mod sync;
pub mod templates;
