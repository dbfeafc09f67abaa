//! Utility functions for string formatting and normalization.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_date, format_optional, normalize_phone, strip_time, truncate_string};
