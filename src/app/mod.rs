use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::filters::FilterSet;
use crate::listing::Post;
use crate::sinks::{Alert, AlertSink, JsonlSink, format_timestamp};
use crate::storage::CursorStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Rules file, one filter per line
    #[arg(short, long)]
    pub filters: Option<PathBuf>,

    /// Feed of posts as JSON lines, newest first ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Alert output as JSON lines ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// File holding the id of the newest post already seen
    #[arg(long)]
    pub cursor: Option<PathBuf>,

    /// Settings file (YAML or TOML)
    #[arg(short, long, env = "DEALWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Load the filters, print them and exit
    #[arg(long)]
    pub check: bool,
}

/// Posts newer than the cursor, and the id to store as the next cursor.
#[derive(Debug)]
pub struct Batch {
    pub posts: Vec<Post>,
    pub newest_id: Option<String>,
}

/// Walk the feed newest-first, stopping at the last seen post.
pub fn take_unseen(feed: Vec<Post>, last_seen: Option<&str>, limit: usize) -> Batch {
    let mut feed = feed.into_iter().take(limit).peekable();
    // The first examined post becomes the cursor even when it was already seen
    let newest_id = feed.peek().map(|post| post.id.clone());
    let posts = feed
        .take_while(|post| Some(post.id.as_str()) != last_seen)
        .collect();
    Batch { posts, newest_id }
}

/// Parse a JSON-lines feed. Blank lines are skipped.
pub fn read_posts<R: BufRead>(reader: R) -> Result<Vec<Post>> {
    let mut posts = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Feed: Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let post: Post = serde_json::from_str(&line)
            .with_context(|| format!("Feed: Invalid post on line {}", i + 1))?;
        posts.push(post);
    }
    Ok(posts)
}

fn open_feed(input: &Path) -> Result<Vec<Post>> {
    if input == Path::new("-") {
        tracing::info!("Feed: reading stdin");
        read_posts(std::io::stdin().lock())
    } else {
        let file =
            File::open(input).with_context(|| format!("Feed: Failed to open {:?}", input))?;
        read_posts(BufReader::new(file))
    }
}

pub fn init_sink(output: &Path) -> Result<Box<dyn AlertSink>> {
    if output == Path::new("-") {
        tracing::info!("Sink: jsonl -> stdout");
        Ok(Box::new(JsonlSink::stdout()?))
    } else {
        tracing::info!("Sink: jsonl -> {:?}", output);
        Ok(Box::new(
            JsonlSink::new(output).with_context(|| format!("Sink: Failed to create {:?}", output))?,
        ))
    }
}

/// Match deal posts against the filters. Alerts keep feed order.
pub fn match_posts(
    filters: &FilterSet,
    posts: &[Post],
    subject_prefix: &str,
    matched_at: &str,
) -> Vec<Alert> {
    posts
        .par_iter()
        .filter(|post| post.is_deal())
        .filter_map(|post| {
            let listing = post.listing();
            filters
                .matching(&listing)
                .map(|filter| Alert::new(post, &listing, filter, subject_prefix, matched_at))
        })
        .collect()
}

pub fn run(cli: &Cli) -> Result<()> {
    let settings =
        Settings::load(cli.config.as_deref()).context("Config: Failed to load settings")?;

    let filters_path = cli
        .filters
        .clone()
        .or_else(|| settings.filters.clone())
        .context("CLI: No rules file given; use --filters or set `filters` in the settings")?;
    let filters = FilterSet::from_path(&filters_path)?;
    tracing::info!("Filters: {} loaded from {:?}", filters.len(), filters_path);

    if cli.check {
        for filter in filters.iter() {
            println!("{}", filter);
        }
        return Ok(());
    }

    let cursor = cli
        .cursor
        .clone()
        .or_else(|| settings.cursor.clone())
        .map(CursorStore::new);
    let last_seen = match &cursor {
        Some(store) => store.load()?,
        None => None,
    };
    tracing::info!("Cursor: last seen {:?}", last_seen);

    let feed = open_feed(&cli.input)?;
    let batch = take_unseen(feed, last_seen.as_deref(), settings.batch_limit);
    tracing::info!("Feed: {} new post(s)", batch.posts.len());

    let start = std::time::Instant::now();
    let matched_at = format_timestamp(time::OffsetDateTime::now_utc())?;
    let alerts = match_posts(&filters, &batch.posts, &settings.subject_prefix, &matched_at);

    let mut sink = init_sink(&cli.output)?;
    for alert in &alerts {
        tracing::info!("Match for {}", alert.title);
        sink.send(alert).context("Sink: Failed to write alert")?;
    }
    sink.finish().context("Sink: Failed to finalize output")?;

    if let (Some(store), Some(newest)) = (&cursor, &batch.newest_id) {
        store.save(newest)?;
    }

    tracing::info!(
        "Done! {} alert(s) from {} post(s) in {:.2}s",
        alerts.len(),
        batch.posts.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            url: String::new(),
            permalink: String::new(),
            selftext: String::new(),
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn take_unseen_stops_at_cursor() {
        let feed = vec![post("c", ""), post("b", ""), post("a", "")];
        let batch = take_unseen(feed, Some("b"), 20);
        assert_eq!(ids(&batch.posts), vec!["c"]);
        assert_eq!(batch.newest_id.as_deref(), Some("c"));
    }

    #[test]
    fn take_unseen_respects_limit() {
        let feed = vec![post("c", ""), post("b", ""), post("a", "")];
        let batch = take_unseen(feed, None, 2);
        assert_eq!(ids(&batch.posts), vec!["c", "b"]);
    }

    #[test]
    fn take_unseen_zero_limit_keeps_cursor() {
        let feed = vec![post("c", ""), post("b", "")];
        let batch = take_unseen(feed, Some("b"), 0);
        assert!(batch.posts.is_empty());
        assert!(batch.newest_id.is_none());
    }

    #[test]
    fn take_unseen_nothing_new() {
        let batch = take_unseen(vec![post("c", "")], Some("c"), 20);
        assert!(batch.posts.is_empty());
        assert_eq!(batch.newest_id.as_deref(), Some("c"));

        let batch = take_unseen(vec![], Some("c"), 20);
        assert!(batch.newest_id.is_none());
    }

    #[test]
    fn read_posts_skips_blank_lines() {
        let input = "{\"id\": \"a\", \"title\": \"[GPU] x $1\"}\n\n{\"id\": \"b\", \"title\": \"y\"}\n";
        let posts = read_posts(input.as_bytes()).unwrap();
        assert_eq!(ids(&posts), vec!["a", "b"]);
    }

    #[test]
    fn read_posts_reports_bad_line() {
        let err = read_posts("{\"id\": \"a\", \"title\": \"x\"}\nnot json\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn match_posts_keeps_order_and_skips_text_posts() {
        let filters = FilterSet::load("[GPU] <500 #{rgb}").unwrap();
        let mut text_post = post("t", "[GPU] rgb card $100");
        text_post.selftext = "discussion".into();
        let posts = vec![
            post("1", "[GPU] RGB card $400"),
            post("2", "[GPU] plain card $300"),
            text_post,
            post("3", "[GPU] RGB card $600"),
            post("4", "[GPU] RGB 12GB $450"),
        ];

        let alerts = match_posts(&filters, &posts, "Price Alert", "now");
        let matched: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(matched, vec!["1", "4"]);
    }
}
