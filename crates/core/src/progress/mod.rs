//! Progress parsing and formatting.
//!
//! Both transfer phases report progress in different shapes: the retrieval
//! process prints human-readable text frames, while the storage service hands
//! back byte counters after every chunk. This module normalises both into a
//! [`ProgressSnapshot`] so the rest of the system never looks at raw output.
//!
//! Everything here is pure and deterministic.

mod format;
mod parser;
mod types;

pub use format::{format_eta, human_readable_size, progress_bar, PROGRESS_BAR_SEGMENTS};
pub use parser::{parse_download_line, parse_eta, parse_size, parse_upload_status};
pub use types::{Phase, ProgressSnapshot};
