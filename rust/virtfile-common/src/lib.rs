//! Core definitions (error handling and common helpers), relied upon by all virtfile-* crates.

pub mod error;
pub mod result;

pub use result::Result;
