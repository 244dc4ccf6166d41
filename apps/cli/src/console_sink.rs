use std::io::Write;

use deckmatch_core::events::{SwipeEvent, SwipeEventSink};
use tracing::{debug, warn};

/// Writes every session event to stdout as one JSON line.
pub struct ConsoleEventSink;

impl SwipeEventSink for ConsoleEventSink {
    fn emit(&self, event: SwipeEvent) {
        if let SwipeEvent::Alert { kind, message } = &event {
            warn!("Alert ({:?}): {}", kind, message);
        }
        match serde_json::to_string(&event) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", line) {
                    debug!("Failed to write event: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    }
}
