//! Valezap - chat client for the Valezap conversation backend
//!
//! Resolves the player, restores or opens a session, replays the history
//! and then sends each line typed on stdin as a chat message.

mod api;
mod config;
mod error;
mod format;
mod identity;
mod message;
mod runtime;
mod session;
mod state_machine;
mod terminal;

use api::HttpChatBackend;
use config::ChatConfig;
use error::ChatError;
use runtime::{ConversationController, SubmitOutcome};
use session::{FileSlotStorage, SessionStore};
use state_machine::ChatContext;
use terminal::TerminalView;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize logging; stdout carries the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "valezap=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env();
    tracing::info!(
        api = %config.api_url,
        state_dir = %config.state_dir.display(),
        max_message_length = config.page.max_message_length,
        session_ttl_seconds = config.page.session_ttl_seconds,
        "Starting valezap client"
    );

    let backend = HttpChatBackend::new(config.api_url.clone(), config.request_timeout)?;
    let sessions = SessionStore::new(FileSlotStorage::new(&config.state_dir));
    let view = TerminalView::new(std::io::stdout());
    let mut controller = ConversationController::new(
        ChatContext::new(config.page.max_message_length),
        backend,
        sessions,
        view,
    );

    let mut page = config.page_url.clone();
    match controller.bootstrap(&mut page).await {
        Ok(player) => {
            tracing::info!(player = %player, page = %page, "Conversation ready");
            println!("** page: {page}");
        }
        // The view already shows the offline state; reloading is the only way on
        Err(ChatError::Session(_)) => return Ok(ExitCode::FAILURE),
        Err(e) => return Err(e.into()),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !controller.state().ended {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        controller.input_changed().await?;
        if line.trim().is_empty() && !controller.state().accepts_input() {
            continue;
        }

        match controller.submit(&line.replace("\\n", "\n")).await {
            Ok(SubmitOutcome::Delivered { .. } | SubmitOutcome::Rejected { .. })
            | Err(ChatError::Send(_)) => {}
            Err(ChatError::Transition(e)) => {
                tracing::warn!(error = %e, "Submission refused");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(player) = controller.player() {
        tracing::info!(player = %player, ended = controller.state().ended, "Client exiting");
    }
    Ok(ExitCode::SUCCESS)
}
