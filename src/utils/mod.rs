// src/utils/mod.rs

pub mod poll;
pub mod shuffle;
