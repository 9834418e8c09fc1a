//! dirwatch - watch a directory and print its changes

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{select, unbounded};
use dirwatch::{Event, Target, WatchConfig};
use owo_colors::OwoColorize;
use std::path::PathBuf;

mod console;

use console::{Command, Format};

/// Print add/remove/modify/rename events for a directory
#[derive(Parser)]
#[command(name = "dirwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch
    dir: PathBuf,

    /// TOML file with watcher settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one JSON object per line instead of colored text
    #[arg(long)]
    json: bool,

    /// Open the directory without starting to watch
    #[arg(long)]
    paused: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable with --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => WatchConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => WatchConfig::default(),
    };
    let format = if cli.json { Format::Json } else { Format::Pretty };

    let target = Target::open_with_config(&cli.dir, &config)
        .with_context(|| format!("Failed to open {}", cli.dir.display()))?;

    // The callback runs on the worker; printing happens here
    let (event_tx, event_rx) = unbounded::<Option<Event>>();
    target.set_callback(move |event: Option<&Event>| {
        let _ = event_tx.send(event.cloned());
    });

    let commands = console::spawn_reader().context("Failed to start console reader")?;

    if format == Format::Pretty {
        println!("Watching {}", cli.dir.display().to_string().cyan());
        println!("{}", "[a]: stop watching  [s]: resume watching  [q]: exit".dimmed());
    }
    if !cli.paused {
        target.start();
    }

    loop {
        select! {
            recv(event_rx) -> message => match message {
                Ok(Some(event)) => {
                    let path = target.full_path(event.name());
                    println!("{}", console::render_event(&event, &path, format));
                }
                Ok(None) => {
                    println!("{}", console::render_failure(target.error(), target.os_error(), format));
                    if format == Format::Pretty {
                        println!("{}", "To exit, enter q.".dimmed());
                    }
                }
                Err(_) => break,
            },
            recv(commands) -> command => match command {
                Ok(Command::Stop) => {
                    target.stop();
                    console::status("Stop", format);
                }
                Ok(Command::Start) => {
                    target.start();
                    console::status("Resume", format);
                }
                Ok(Command::Quit) | Err(_) => {
                    console::status("Exit", format);
                    break;
                }
            },
        }
    }

    target.close();
    Ok(())
}
