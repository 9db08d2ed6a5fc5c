//! Subcommand implementations

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use ondu_client::OnduClient;
use ondu_config::Settings;
use ondu_core::{Article, ArticleSummary};
use ondu_playlist::{HttpPrefetcher, PlaylistEvent, PlaylistState};
use ondu_reader::{ProbeMedia, ReaderSession, DEFAULT_TICK};
use ondu_reconciler::{initial_statuses, GenerationProgress};
use ondu_text_processing::{heuristic_timings, tokenize};

use crate::render;

fn client(settings: &Settings) -> Result<OnduClient> {
    OnduClient::new(&settings.api).context("Failed to create backend client")
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn list(settings: &Settings, json: bool) -> Result<()> {
    let articles: Vec<ArticleSummary> = client(settings)?
        .list_articles()
        .await
        .context("Failed to list articles")?;
    if json {
        return print_json(&articles);
    }
    if articles.is_empty() {
        println!("No articles yet.");
    }
    for article in &articles {
        println!("{}\t{}", article.id, article.title);
    }
    Ok(())
}

pub async fn show(settings: &Settings, article_id: &str, json: bool) -> Result<()> {
    let article = client(settings)?
        .get_article(article_id)
        .await
        .with_context(|| format!("Failed to load article {}", article_id))?;
    print_article(settings, &article, json)
}

fn print_article(settings: &Settings, article: &Article, json: bool) -> Result<()> {
    if json {
        return print_json(article);
    }
    let statuses = initial_statuses(article);
    let progress = GenerationProgress::compute(article, &statuses, &settings.api.static_prefix);
    print!("{}", render::article_listing(article, &statuses));
    println!("{}", render::progress_line(&progress));
    Ok(())
}

pub async fn delete(settings: &Settings, article_id: &str) -> Result<()> {
    client(settings)?
        .delete_article(article_id)
        .await
        .with_context(|| format!("Failed to delete article {}", article_id))?;
    println!("Deleted {}", article_id);
    Ok(())
}

pub async fn upload(
    settings: &Settings,
    text: Option<&str>,
    file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let client = client(settings)?;
    let article = match (text, file) {
        (Some(text), _) => client.upload_text(text).await,
        (None, Some(path)) => client.upload_file(path).await,
        (None, None) => bail!("Please provide a file or raw text."),
    }
    .context("Upload failed")?;

    tracing::info!(article_id = %article.id, paragraphs = article.paragraphs.len(), "Uploaded");
    print_article(settings, &article, json)
}

pub async fn status(settings: &Settings, task_id: &str, json: bool) -> Result<()> {
    let response = client(settings)?
        .task_status(task_id)
        .await
        .with_context(|| format!("Failed to query task {}", task_id))?;
    if json {
        return print_json(&response);
    }
    let status = response.normalized_status();
    match response.result_path() {
        Some(path) => println!("{}\t{}", status, path),
        None => println!("{}", status),
    }
    Ok(())
}

pub fn timings(text: &str, duration: f64, json: bool) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        bail!("Duration must be a positive number of seconds");
    }
    let timings = heuristic_timings(&tokenize(text), duration);
    if json {
        return print_json(&timings);
    }
    println!("{}", render::timings_table(&timings));
    Ok(())
}

/// Terminal input mapped onto reader key codes
fn key_code(input: &str) -> Option<&'static str> {
    match input {
        "" | " " => Some("Space"),
        "n" => Some("ArrowRight"),
        "p" => Some("ArrowLeft"),
        _ => None,
    }
}

/// Whether `event` leaves nothing more to play
///
/// Either the last track played through, or it was skipped after its
/// retries ran out.
fn reached_end(event: &PlaylistEvent, state: &PlaylistState) -> bool {
    match event {
        PlaylistEvent::PlaybackChanged { is_playing: false } => {
            state.is_last() && state.progress() >= 1.0
        }
        PlaylistEvent::TrackSkipped { track_id } => {
            state.tracks.last().is_some_and(|t| &t.id == track_id)
        }
        _ => false,
    }
}

pub async fn read(settings: &Settings, article_id: &str, start: usize) -> Result<()> {
    let client = Arc::new(client(settings)?);
    let base = Some(client.base_url().clone());
    let (media, media_events) = ProbeMedia::new(client.http().clone(), base.clone(), DEFAULT_TICK);
    let prefetcher = Arc::new(HttpPrefetcher::new(client.http().clone(), base));

    let session = ReaderSession::open(
        Arc::clone(&client),
        article_id,
        Arc::new(media),
        prefetcher,
        settings,
    )
    .await
    .with_context(|| format!("Failed to open article {}", article_id))?;

    let playlist = session.playlist().clone();
    if playlist.snapshot().is_empty() {
        println!("Nothing to read.");
        return Ok(());
    }
    let mut events = playlist.subscribe();
    let driver = {
        let playlist = playlist.clone();
        tokio::spawn(async move { media_events.run(&playlist).await })
    };

    let color = std::io::stdout().is_terminal();
    println!("{}", session.title());
    println!("{}", render::progress_line(&session.progress()));
    println!("Enter: play/pause  n: next  p: previous  q: quit");

    session.set_focus(true);
    session.set_index(start.saturating_sub(1)).await;
    session.play().await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_word = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim() == "q" => break,
                Ok(Some(line)) => {
                    if let Some(code) = key_code(line.trim()) {
                        session.handle_key(code).await;
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            event = events.recv() => match event {
                Ok(PlaylistEvent::TrackChanged { index, .. }) => {
                    last_word = None;
                    println!();
                    println!("[{}/{}]", index + 1, playlist.snapshot().len());
                }
                Ok(PlaylistEvent::TimeUpdated { .. }) => {
                    let state = playlist.snapshot();
                    let active = session.active_word();
                    if active != last_word {
                        last_word = active;
                        if let Some(segments) = session.segments(state.active_index) {
                            print!("\r{}  {}", render::highlighted(&segments, color), session.time_label());
                            let _ = std::io::stdout().flush();
                        }
                    }
                }
                Ok(PlaylistEvent::NoticeChanged { notice: Some(notice) }) => {
                    eprintln!();
                    eprintln!("{}", notice.message);
                }
                Ok(PlaylistEvent::Loaded { .. }) => {
                    println!();
                    println!("{}", render::progress_line(&session.progress()));
                }
                Ok(event) if reached_end(&event, &playlist.snapshot()) => {
                    println!();
                    println!("Finished.");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.close();
    driver.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondu_core::Track;

    #[test]
    fn test_key_codes() {
        assert_eq!(key_code(""), Some("Space"));
        assert_eq!(key_code("n"), Some("ArrowRight"));
        assert_eq!(key_code("p"), Some("ArrowLeft"));
        assert_eq!(key_code("x"), None);
    }

    fn two_tracks() -> PlaylistState {
        PlaylistState {
            tracks: vec![
                Track::new("p1", "One", "/static/p1.wav"),
                Track::new("p2", "Two", "/static/p2.wav"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_reached_end_after_last_track_plays_through() {
        let paused = PlaylistEvent::PlaybackChanged { is_playing: false };
        let mut state = two_tracks();
        state.duration = 2.0;
        state.current_time = 2.0;
        assert!(!reached_end(&paused, &state));

        state.active_index = 1;
        assert!(reached_end(&paused, &state));

        state.current_time = 1.0;
        assert!(!reached_end(&paused, &state));
    }

    #[test]
    fn test_reached_end_when_last_track_is_skipped() {
        let mut state = two_tracks();
        state.active_index = 1;
        assert!(reached_end(
            &PlaylistEvent::TrackSkipped { track_id: "p2".to_string() },
            &state
        ));
        assert!(!reached_end(
            &PlaylistEvent::TrackSkipped { track_id: "p1".to_string() },
            &state
        ));
        assert!(!reached_end(
            &PlaylistEvent::TrackSkipped { track_id: "p2".to_string() },
            &PlaylistState::default()
        ));
    }

    #[test]
    fn test_timings_rejects_bad_duration() {
        assert!(timings("Hello", 0.0, false).is_err());
        assert!(timings("Hello", f64::NAN, false).is_err());
        assert!(timings("Hello world", 1.0, false).is_ok());
    }
}
