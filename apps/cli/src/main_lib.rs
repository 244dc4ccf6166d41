use std::sync::Arc;

use deckmatch_connect::{DeckmatchApiClient, PollingProfileSubscriber, RemoteSessionStore};
use deckmatch_core::clock::SystemClock;
use deckmatch_core::join::DismissOutcome;
use deckmatch_core::session::Session;
use deckmatch_core::{EngineConfig, SwipeSession, SwipeSessionDeps};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::{Command, HELP};
use crate::config::Config;
use crate::console_sink::ConsoleEventSink;

pub fn init_tracing() {
    let log_format = std::env::var("DECKMATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the event stream.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub fn build_session(config: &Config) -> anyhow::Result<SwipeSession> {
    let client = Arc::new(DeckmatchApiClient::new(&config.api_url, &config.access_token)?);
    info!("Using API at {}", client.base_url());

    let session = config.user_id.as_ref().map(|user_id| Session {
        display_name: config.display_name.clone(),
        ..Session::new(user_id.clone())
    });
    let store = Arc::new(RemoteSessionStore::new(client.clone(), session));
    let subscriber = Arc::new(PollingProfileSubscriber::new(
        client.clone(),
        config.poll_interval,
    ));

    let engine_config = EngineConfig::default().with_viewport_width(config.viewport_width);
    let deps = SwipeSessionDeps {
        source: client.clone(),
        images: client.clone(),
        join_backend: client,
        subscriber,
        store,
        sink: Arc::new(ConsoleEventSink),
        clock: Arc::new(SystemClock),
    };
    Ok(SwipeSession::new(engine_config, deps))
}

/// Run one command. Returns `false` once the session should end.
pub async fn dispatch(session: &SwipeSession, command: Command) -> bool {
    let result = match command {
        Command::Skip => session.skip().await.map(|_| ()),
        Command::Right => session.commit_right().await.map(|_| ()),
        Command::Undo => session.undo().map(|_| ()),
        Command::Drag { dx, dy } => {
            if !session.drag(dx, dy) {
                info!("No card to drag");
            }
            Ok(())
        }
        Command::Release { dx, dy } => session.release(dx, dy).await.map(|_| ()),
        Command::Cancel => {
            session.cancel_drag();
            Ok(())
        }
        Command::Dismiss => {
            report_dismiss(session.dismiss_interstitial().await);
            Ok(())
        }
        Command::Wait => {
            if session.wait_until_dismissible().await {
                report_dismiss(session.dismiss_interstitial().await);
            } else {
                info!("No interstitial is open");
            }
            Ok(())
        }
        Command::Reload => session.reload().await,
        Command::Explore => session.explore().await,
        Command::Show => {
            show(session);
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => return false,
    };

    if let Err(e) = result {
        warn!("{}", e.user_message());
    }
    true
}

fn report_dismiss(outcome: DismissOutcome) {
    match outcome {
        DismissOutcome::Ignored => info!("Nothing to dismiss"),
        DismissOutcome::NotYetDismissible => info!("The interstitial cannot be dismissed yet"),
        DismissOutcome::Completed(join) => info!("Join finished: joined={}", join.is_joined()),
    }
}

fn show(session: &SwipeSession) {
    let deck = session.deck();
    let snapshot = serde_json::json!({
        "mode": deck.mode(),
        "pointer": deck.pointer(),
        "len": deck.len(),
        "undoable": deck.skip_stack().len(),
        "pendingJoin": session.pending_join().map(|p| p.item.id),
        "current": session.current(),
    });
    println!("{}", snapshot);
}
