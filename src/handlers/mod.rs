// src/handlers/mod.rs

pub mod command;
pub mod console;
pub mod session;
