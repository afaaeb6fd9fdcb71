//! Track listing for Sono - folder scanning

mod scanner;

pub use scanner::{scan_folder, ScanError, TrackEntry};
