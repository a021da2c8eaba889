//! Audio Engine Module
//!
//! Offline plumbing around the disperser:
//! - Audio buffer management
//! - File I/O operations

pub mod buffer;
pub mod io;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{export_audio, import_audio, ExportFormat};
