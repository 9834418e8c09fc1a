//! Console input and event rendering

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use dirwatch::{ErrorKind, Event, EventKind};
use owo_colors::OwoColorize;
use serde_json::json;
use std::io::BufRead;
use std::path::Path;
use std::thread;

/// Console command, one per input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Start,
    Quit,
}

impl Command {
    /// Parse a line; case-insensitive, surrounding whitespace ignored
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "stop" => Some(Command::Stop),
            "s" | "start" => Some(Command::Start),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Output style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

/// Read commands from stdin on a background thread
///
/// The channel disconnects when stdin reaches EOF.
pub fn spawn_reader() -> Result<Receiver<Command>> {
    let (tx, rx) = unbounded();

    thread::Builder::new()
        .name("dirwatch-console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => eprintln!("Unknown command '{}' (use a, s or q)", line.trim()),
                }
            }
        })?;

    Ok(rx)
}

/// One line describing an event
pub fn render_event(event: &Event, full_path: &Path, format: Format) -> String {
    match format {
        Format::Json => json!({
            "kind": event.kind(),
            "name": event.name(),
            "path": full_path,
        })
        .to_string(),
        Format::Pretty => {
            let label = format!("{:<12}", event.kind().label());
            let label = match event.kind() {
                EventKind::Added => label.green().to_string(),
                EventKind::Removed => label.red().to_string(),
                EventKind::Modified => label.yellow().to_string(),
                EventKind::RenamedFrom | EventKind::RenamedTo => label.cyan().to_string(),
                EventKind::None => label.dimmed().to_string(),
            };
            format!("{} {}", label, full_path.display())
        }
    }
}

/// One line describing a fatal watcher failure
pub fn render_failure(kind: ErrorKind, os_error: i32, format: Format) -> String {
    match format {
        Format::Json => json!({
            "error": kind.to_string(),
            "os_error": os_error,
        })
        .to_string(),
        Format::Pretty => format!(
            "{} {} (os error {})",
            "Watcher failed:".red().bold(),
            kind,
            os_error
        ),
    }
}

/// Acknowledge a console command
pub fn status(message: &str, format: Format) {
    match format {
        Format::Json => eprintln!("{}", message),
        Format::Pretty => println!("{}", message.bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("a"), Some(Command::Stop));
        assert_eq!(Command::parse("STOP\n"), Some(Command::Stop));
        assert_eq!(Command::parse(" s "), Some(Command::Start));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("x"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_render_event_json() {
        let event = Event::new(EventKind::RenamedTo, "b.txt");
        let line = render_event(&event, Path::new("/watched/b.txt"), Format::Json);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "renamed_to");
        assert_eq!(value["name"], "b.txt");
        assert_eq!(value["path"], "/watched/b.txt");
    }

    #[test]
    fn test_render_event_pretty() {
        let event = Event::new(EventKind::Added, "a.txt");
        let line = render_event(&event, Path::new("/watched/a.txt"), Format::Pretty);
        assert!(line.contains("Added"));
        assert!(line.ends_with("/watched/a.txt"));
    }

    #[test]
    fn test_render_failure_json() {
        let line = render_failure(ErrorKind::AccessDenied, 13, Format::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["os_error"], 13);
        assert_eq!(value["error"], ErrorKind::AccessDenied.to_string());
    }
}
