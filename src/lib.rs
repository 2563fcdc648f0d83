// src/lib.rs

pub mod config;
pub mod controller;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod state;
pub mod utils;

// Re-export specific items for convenience
pub use controller::QuizAttemptController;
pub use error::AttemptError;
pub use grading::GradingService;
