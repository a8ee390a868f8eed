pub mod errors;
pub mod model;
mod reader;

pub use errors::ParserError;
pub use model::{column_kinds, ColumnKind};
pub use reader::parse_recording;
