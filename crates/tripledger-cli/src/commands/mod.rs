//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, settings, AI client, date parsing)
//! - `records` - Trip, expense and mileage commands
//! - `reports` - Report generation and template analysis
//! - `extraction` - Receipt and odometer commands
//! - `serve` - Web server command

pub mod core;
pub mod extraction;
pub mod records;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use extraction::*;
pub use records::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
