//! Line commands read from stdin.

use anyhow::{anyhow, bail};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Skip,
    Right,
    Undo,
    Drag { dx: f64, dy: f64 },
    Release { dx: f64, dy: f64 },
    Cancel,
    Dismiss,
    Wait,
    Reload,
    Explore,
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "commands: left|skip, right, undo, drag <dx> <dy>, release <dx> <dy>, \
cancel, dismiss, wait, reload, explore, show, help, quit";

impl Command {
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let command = match word.to_ascii_lowercase().as_str() {
            "left" | "skip" | "l" => Self::Skip,
            "right" | "r" => Self::Right,
            "undo" | "back" | "u" => Self::Undo,
            "drag" => {
                let (dx, dy) = offsets(&args)?;
                Self::Drag { dx, dy }
            }
            "release" => {
                let (dx, dy) = offsets(&args)?;
                Self::Release { dx, dy }
            }
            "cancel" => Self::Cancel,
            "dismiss" | "d" => Self::Dismiss,
            "wait" => Self::Wait,
            "reload" => Self::Reload,
            "explore" => Self::Explore,
            "show" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("Unknown command '{}'", other),
        };
        Ok(Some(command))
    }
}

fn offsets(args: &[&str]) -> anyhow::Result<(f64, f64)> {
    let [dx, dy] = args else {
        bail!("Expected two offsets, got {}", args.len());
    };
    let parse = |raw: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| anyhow!("Invalid offset '{}'", raw))
    };
    Ok((parse(dx)?, parse(dy)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_simple_commands() {
        assert_eq!(Command::parse("left").unwrap(), Some(Command::Skip));
        assert_eq!(Command::parse("  SKIP ").unwrap(), Some(Command::Skip));
        assert_eq!(Command::parse("r").unwrap(), Some(Command::Right));
        assert_eq!(Command::parse("back").unwrap(), Some(Command::Undo));
        assert_eq!(Command::parse("quit").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("").unwrap(), None);
    }

    #[test]
    fn test_parses_gesture_offsets() {
        assert_eq!(
            Command::parse("release 160 -12.5").unwrap(),
            Some(Command::Release { dx: 160.0, dy: -12.5 })
        );
        assert_eq!(
            Command::parse("drag -3 4").unwrap(),
            Some(Command::Drag { dx: -3.0, dy: 4.0 })
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(Command::parse("release 10").is_err());
        assert!(Command::parse("release ten 0").is_err());
        assert!(Command::parse("drag NaN 0").is_err());
        assert!(Command::parse("superlike").is_err());
    }
}
