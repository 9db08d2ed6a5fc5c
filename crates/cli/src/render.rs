//! Terminal rendering

use ondu_core::{Article, TaskStatusMap};
use ondu_reconciler::{status_label, GenerationProgress};
use ondu_text_processing::{HighlightSegment, WordTiming};

const REVERSE: &str = "\x1b[7m";
const RESET: &str = "\x1b[0m";

/// Paragraph text with the active word in reverse video
pub fn highlighted(segments: &[HighlightSegment], color: bool) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            HighlightSegment::Word { text, active: true, .. } if color => {
                out.push_str(REVERSE);
                out.push_str(text);
                out.push_str(RESET);
            }
            HighlightSegment::Word { text, active: true, .. } => {
                out.push('[');
                out.push_str(text);
                out.push(']');
            }
            other => out.push_str(other.text()),
        }
    }
    out
}

pub fn progress_line(progress: &GenerationProgress) -> String {
    format!("{} {}% ({})", progress.caption(), progress.percent, progress.label())
}

/// One paragraph per line, prefixed with its status badge
pub fn article_listing(article: &Article, statuses: &TaskStatusMap) -> String {
    let mut out = format!("{} ({})\n", article.title, article.id);
    for (i, p) in article.paragraphs.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. [{:<7}] {}\n",
            i + 1,
            status_label(statuses, &p.id),
            p.text
        ));
    }
    out
}

pub fn timings_table(timings: &[WordTiming]) -> String {
    timings
        .iter()
        .map(|w| format!("{:>8.3} {:>8.3}  {}", w.start, w.end, w.word))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondu_core::{Paragraph, TaskStatus};
    use ondu_text_processing::{heuristic_timings, highlight_segments, tokenize};

    #[test]
    fn test_highlight_plain_and_color() {
        let segments = highlight_segments("Hello  world", Some(1));
        assert_eq!(highlighted(&segments, false), "Hello  [world]");
        assert_eq!(highlighted(&segments, true), "Hello  \x1b[7mworld\x1b[0m");
        assert_eq!(highlighted(&highlight_segments("Hello  world", None), true), "Hello  world");
    }

    #[test]
    fn test_article_listing_badges() {
        let article = Article::new(
            "a1",
            "Title",
            vec![
                Paragraph::new("p1", "One").with_task_id("t1"),
                Paragraph::new("p2", "Two"),
            ],
        );
        let mut statuses = TaskStatusMap::new();
        statuses.insert("p1".to_string(), TaskStatus::Started);

        let listing = article_listing(&article, &statuses);
        assert!(listing.starts_with("Title (a1)\n"));
        assert!(listing.contains("  1. [STARTED] One"));
        assert!(listing.contains("  2. [PENDING] Two"));
    }

    #[test]
    fn test_timings_table() {
        let timings = heuristic_timings(&tokenize("ab cd"), 2.0);
        assert_eq!(timings_table(&timings), "   0.000    1.000  ab\n   1.000    2.000  cd");
    }

    #[test]
    fn test_progress_line() {
        let progress = GenerationProgress {
            tracked: 4,
            ready: 2,
            failed: 1,
            percent: 50,
        };
        assert_eq!(
            progress_line(&progress),
            "Generating audio in the background… 50% (2/4 ready, 1 failed)"
        );
    }
}
