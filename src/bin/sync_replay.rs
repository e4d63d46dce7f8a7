use anyhow::{Context, Result, bail};
use clap::Parser;
use slidesync::config::{Config, default_config_path};
use slidesync::engine::{Navigation, PlayerMessage, SyncEvent, SyncSession, spawn_caption_loads};
use slidesync::fetch::Fetcher;
use slidesync::talk::assemble;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "sync_replay")]
#[command(about = "Replay player and navigation events against a talk and print the resulting sync effects")]
struct Cli {
    #[arg(short = 'c', long = "config")]
    config_path: Option<String>,
    /// Key of the talk in the catalog.
    key: String,
}

/// One command per line: `position <seconds>`, `first`, `prev`, `next`,
/// `lang <code>`, `ended`. Blank lines and `#` comments are skipped.
fn parse_command(line: &str) -> Result<Option<SyncEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, Some(argument.trim())),
        None => (line, None),
    };

    let event = match (command, argument) {
        ("position", Some(seconds)) => {
            let seconds: f64 = seconds.parse().with_context(|| format!("invalid position '{}'", seconds))?;
            if !seconds.is_finite() {
                bail!("position '{}' is not a finite number", seconds);
            }
            SyncEvent::Player(PlayerMessage::Position(seconds))
        }
        ("first", None) => SyncEvent::Navigate(Navigation::First),
        ("prev", None) => SyncEvent::Navigate(Navigation::Previous),
        ("next", None) => SyncEvent::Navigate(Navigation::Next),
        ("lang", Some(language)) => SyncEvent::SelectLanguage(language.to_string()),
        ("ended", None) => SyncEvent::Ended,
        _ => bail!("unknown command '{}'", line),
    };
    Ok(Some(event))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the effects.
    tracing_subscriber::fmt().json().with_writer(std::io::stderr).init();

    let config_path = cli
        .config_path
        .unwrap_or_else(|| default_config_path().to_string_lossy().into_owned());
    let cfg = Config::new(&config_path).with_context(|| format!("failed to load config {}", config_path))?;
    let catalog = cfg.catalog()?;
    let entry = catalog.lookup(&cli.key)?;
    let fetcher = Fetcher::new(&cfg.app)?;

    let assembled = assemble(&fetcher, &cfg.app, entry.talk).await;
    let engine = assembled.engine_for(&entry)?;
    tracing::info!(
        talk = %entry.talk.key,
        sync_elements = engine.len(),
        timecodes = assembled.timecodes.len(),
        "replaying"
    );

    let (session, events, mut effects) = SyncSession::new(engine, 64);
    let printer = tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            match serde_json::to_string(&effect) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!(error = %e, "failed to encode effect"),
            }
        }
    });
    let running = tokio::spawn(session.run());

    // Captions first, so replays do not depend on load timing.
    for load in spawn_caption_loads(&fetcher, &entry.talk.captions, &events) {
        if let Err(e) = load.await {
            tracing::warn!(error = %e, "caption load task failed");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        match parse_command(&line) {
            Ok(Some(event)) => events.send(event).await.context("sync session stopped")?,
            Ok(None) => {}
            Err(e) => tracing::warn!(line = line_number, error = %e, "skipping command"),
        }
    }

    drop(events);
    let engine = running.await?;
    printer.await?;
    tracing::info!(
        current = engine.current(),
        slide = engine.current_slide(),
        cue = ?engine.current_cue(),
        "replay finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(matches!(
            parse_command("position 12.5").unwrap(),
            Some(SyncEvent::Player(PlayerMessage::Position(t))) if t == 12.5
        ));
        assert!(matches!(
            parse_command("  next ").unwrap(),
            Some(SyncEvent::Navigate(Navigation::Next))
        ));
        assert!(matches!(
            parse_command("lang x-none").unwrap(),
            Some(SyncEvent::SelectLanguage(l)) if l == "x-none"
        ));
        assert!(parse_command("# comment").unwrap().is_none());
        assert!(matches!(parse_command("ended").unwrap(), Some(SyncEvent::Ended)));
        assert!(parse_command("position soon").is_err());
        assert!(parse_command("position NaN").is_err());
        assert!(parse_command("position inf").is_err());
        assert!(parse_command("next 3").is_err());
        assert!(parse_command("jump").is_err());
    }
}
