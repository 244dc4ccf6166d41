mod commands;
mod config;
mod console_sink;
mod main_lib;

use commands::Command;
use config::Config;
use main_lib::{build_session, dispatch, init_tracing};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let session = build_session(&config)?;

    if let Err(e) = session.start().await {
        session.end();
        anyhow::bail!("Could not start the session: {}", e.user_message());
    }
    tracing::info!("Session started; type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if !dispatch(&session, command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }

    session.end();
    tracing::info!("Session ended");
    Ok(())
}
