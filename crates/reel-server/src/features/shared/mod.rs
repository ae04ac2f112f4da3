//! Shared utilities and types for feature modules
//!
//! - **pagination**: offset/limit pagination and navigation links

pub mod pagination;

pub use pagination::{OffsetPage, OffsetParams};
