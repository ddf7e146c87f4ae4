pub mod format;

pub use format::{export_filename, format, ExportError, ExportKind, ExportPayload};
