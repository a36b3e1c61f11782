pub mod markup;
pub mod structured_document;
pub mod structured_editor;
