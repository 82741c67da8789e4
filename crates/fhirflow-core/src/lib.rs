pub mod error;
pub mod extracted;
pub mod path;
pub mod record;

pub use error::{CoreError, Result};
pub use extracted::{ExtractedIndex, ExtractedValue};
pub use path::{Segment, parse_path, prefix_key, resolve_path, sanitize_path};
pub use record::Record;
