//! Core engine — classify → match → aggregate.

pub mod accountant;
pub mod hunter;
pub mod matcher;
