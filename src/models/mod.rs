//! Data models for callscribe

pub mod analysis;

pub use analysis::CallAnalysis;
