//! Rendering of rebuilt documents: text, JSON, row records and line maps.

mod json;
mod lines;
mod options;
mod rows;
mod text;

pub use json::{to_json, to_json_value, JsonFormat};
pub use lines::LineMap;
pub use options::{PageSelection, TextOptions};
pub use rows::{to_rows, RowRecord};
pub use text::to_text;
