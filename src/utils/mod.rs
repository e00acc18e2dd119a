//! Shared volume utilities

pub mod padding;

pub use padding::{crop, pad_edge, pad_widths};
