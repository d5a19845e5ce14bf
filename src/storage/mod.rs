//! Local storage helpers
//!
//! - Random names for files, short URLs and deletion tokens
//! - Human-readable sizes
//! - Reconciling the upload directory with the metadata store

pub mod index;
pub mod names;
pub mod size;

pub use index::{index_uploads, IndexReport};
pub use names::{deletion_token, extension, sanitize_file_name, NameGenerator, NameMode};
pub use size::human_readable_size;
