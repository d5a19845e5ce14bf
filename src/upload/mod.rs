//! Streaming Multipart Upload Module
//!
//! Ingests `multipart/form-data` bodies without buffering them:
//! - Boundary scanning across arbitrary network chunk splits
//! - Bounded memory: at most one read plus the retention margin, or plus
//!   one part header line when that line is longer
//! - Temp-file lifecycle with cleanup on every exit path
//! - Finalization into permanent storage plus a metadata row
//!
//! Flow:
//! 1. Endpoint checks content type, boundary and filename
//! 2. Session streams the file part into a unique temp file
//! 3. Finalizer moves it to its permanent name and records it
//! 4. A periodic sweep removes temp files orphaned by crashes

pub mod finalize;
pub mod scanner;
pub mod session;
pub mod sweep;
pub mod types;
pub mod writer;

pub use finalize::{CommittedFile, Finalizer};
pub use scanner::{locate, parse_boundary, BoundaryError, Delimiter, Location, PartHeader};
pub use session::{ingest, IngestedUpload, SessionLimits, UploadSession};
pub use sweep::{start_maintenance_task, sweep_temp_files};
pub use types::*;
pub use writer::{ChunkWriter, TempUpload};
