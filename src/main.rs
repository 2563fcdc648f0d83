// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use proctor::config::Config;
use proctor::error::AttemptError;
use proctor::grading::LocalGrader;
use proctor::handlers::session::Session;
use proctor::models::Quiz;
use proctor::state::AppState;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "proctor.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    // stdout carries the quiz itself, so console logs go to stderr.
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    let quiz = match load_quiz(&config.quiz_file).await {
        Ok(quiz) => quiz,
        Err(e) => {
            tracing::error!("Failed to load quiz from {}: {}", config.quiz_file, e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Loaded quiz '{}' with {} questions",
        quiz.id,
        quiz.questions.len()
    );

    let grader = Arc::new(LocalGrader::with_quiz(quiz.clone()));
    let state = AppState::new(config, grader);

    let session = Session::new(&state, quiz.public_view());
    let stdin = BufReader::new(tokio::io::stdin());

    if let Err(e) = session.run(stdin, tokio::io::stdout()).await {
        tracing::error!("Session ended with error: {}", e);
        std::process::exit(1);
    }
}

async fn load_quiz(path: &str) -> Result<Quiz, AttemptError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Quiz::from_json(&raw)
}
