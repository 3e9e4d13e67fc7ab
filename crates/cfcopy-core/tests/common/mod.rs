#![allow(dead_code)]

pub mod memory;

#[allow(unused_imports)]
pub use memory::{pattern_bytes, Call, MemoryStore};

pub const SRC_REGION: &str = "SRC";
pub const DST_REGION: &str = "DST";
