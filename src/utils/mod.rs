//! Utility modules
//!
//! Contains the I/O wrappers around the engine:
//! - Input: loading string lists from `.txt` / `.json`
//! - Display: console output for batch runs

pub mod display;
pub mod input;

// Re-export commonly used functions
pub use display::print_records;
pub use input::{check_input_extension, read_strings};
