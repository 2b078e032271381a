//! CLI parsing and orchestration. Parses args, runs one source operation, prints JSON or
//! rendered chapter text. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::engine::{CancelFlag, StopReason};
use crate::error::SourceError;
use crate::http::{PoliteClient, DEFAULT_DELAY_MS, DEFAULT_TIMEOUT_SECS};
use crate::model::ChapterContent;
use crate::sources::ops::{self, ChapterListOptions};
use crate::sources::{resolve_site, ListingKind, Site, SiteProfile};
use clap::{ArgAction, Parser, Subcommand};
use scraper::Html;
use serde::Serialize;
use std::cell::RefCell;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl CliRunError {
    /// 1 for bad input (including filter validation), 2 for fetch or source failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Source(
                SourceError::Validation { .. }
                | SourceError::InvalidUrl { .. }
                | SourceError::UnrecognizedHost { .. }
                | SourceError::UnknownSource { .. },
            ) => 1,
            CliRunError::Source(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// How `read` prints a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFormat {
    Html,
    Markdown,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "novelsrc")]
#[command(about = "Browse web-novel sites and extract works, chapter lists and chapter text")]
#[command(
    after_help = "Config file keys (user_agent, request_delay_ms, timeout_secs, [headers], [pagination]) are read from ./novelsrc.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format: text or json (logs go to stderr).
    #[arg(long, default_value = "text", value_parser = parse_log_format, global = true)]
    pub log_format: LogFormat,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Delay between requests in milliseconds (overrides config; default 500).
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported sites.
    Sites,

    /// Popular works on a site.
    Popular {
        #[arg(long, value_parser = parse_site)]
        site: Site,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Recently updated works on a site.
    Latest {
        #[arg(long, value_parser = parse_site)]
        site: Site,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Search by keyword, or with filters only when QUERY is omitted.
    Search {
        #[arg(long, value_parser = parse_site)]
        site: Site,
        query: Option<String>,
        /// Filter value as "Name=value"; repeatable. Multi-selects take comma-separated options.
        #[arg(long = "filter", value_parser = parse_filter_arg)]
        filters: Vec<(String, String)>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Show the search filters a site offers.
    Filters {
        #[arg(long, value_parser = parse_site)]
        site: Site,
    },

    /// Metadata of one work.
    Details {
        url: String,
        /// Override site detection (needed for site-relative paths).
        #[arg(long, value_parser = parse_site)]
        site: Option<Site>,
    },

    /// Full chapter list of a work, oldest first.
    Chapters {
        url: String,
        #[arg(long, value_parser = parse_site)]
        site: Option<Site>,
    },

    /// Print one chapter.
    Read {
        url: String,
        #[arg(long, value_parser = parse_site)]
        site: Option<Site>,
        /// html, markdown, or text.
        #[arg(long, default_value = "html", value_parser = parse_read_format)]
        format: ReadFormat,
    },
}

fn parse_site(s: &str) -> Result<Site, String> {
    s.parse::<Site>().map_err(|_| {
        let ids: Vec<&str> = Site::ALL.iter().map(|site| site.id()).collect();
        format!("Invalid --site value: '{}'. Use one of: {}.", s, ids.join(", "))
    })
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(format!("Invalid --log-format value: '{}'. Use text or json.", s)),
    }
}

fn parse_read_format(s: &str) -> Result<ReadFormat, String> {
    match s.to_lowercase().as_str() {
        "html" => Ok(ReadFormat::Html),
        "markdown" | "md" => Ok(ReadFormat::Markdown),
        "text" | "txt" => Ok(ReadFormat::Text),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use html, markdown, or text.",
            s
        )),
    }
}

fn parse_filter_arg(s: &str) -> Result<(String, String), String> {
    let (name, value) = s.split_once('=').ok_or_else(|| {
        format!(
            "Invalid --filter: expected 'Name=value' (e.g. \"Genres=Action,Fantasy\"), got '{}'",
            s
        )
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid --filter: missing filter name in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Initialize tracing based on CLI flags.
pub fn init_tracing(args: &Args) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match args.verbose {
        0 => "novelsrc=warn",
        1 => "novelsrc=debug",
        _ => "novelsrc=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let result = match args.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Warning: could not initialize logging: {}", e);
    }
}

/// Strip HTML from a chapter body to plain text, one paragraph per block.
fn body_to_plain_text(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let root = fragment.root_element();
    let paragraphs: Vec<String> = match scraper::Selector::parse("p") {
        Ok(sel) => root
            .select(&sel)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };
    if !paragraphs.is_empty() {
        return paragraphs.join("\n\n");
    }
    let text: String = root.text().collect();
    if text.trim().is_empty() {
        body.trim().to_string()
    } else {
        text.trim().to_string()
    }
}

fn render_chapter(content: &ChapterContent, format: ReadFormat) -> String {
    match format {
        ReadFormat::Html => content.html.clone(),
        ReadFormat::Markdown => html2md::parse_html(&content.html).trim().to_string(),
        ReadFormat::Text => body_to_plain_text(&content.html),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliRunError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| CliRunError::Output(e.to_string()))?;
    writeln!(out).map_err(|e| CliRunError::Output(e.to_string()))
}

fn build_client(args: &Args, config: Option<&Config>) -> Result<PoliteClient, CliRunError> {
    let delay_ms = args
        .delay
        .or_else(|| config.and_then(|c| c.request_delay_ms))
        .unwrap_or(DEFAULT_DELAY_MS);
    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()));

    let mut builder = PoliteClient::builder()
        .delay_ms(delay_ms)
        .timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(c) = config {
        for (name, value) in &c.headers {
            builder = builder.header(name.clone(), value.clone());
        }
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

/// Cancel `cancel` on the first Ctrl-C so a running chapter list returns what it has.
/// A second Ctrl-C exits immediately.
fn cancel_on_interrupt(cancel: CancelFlag) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(error) => {
                    tracing::warn!(%error, "failed to start Ctrl+C listener");
                    return;
                }
            };
            runtime.block_on(async {
                if let Err(error) = tokio::signal::ctrl_c().await {
                    tracing::warn!(%error, "failed to capture Ctrl+C signal");
                    return;
                }
                tracing::warn!("interrupted; stopping after the current page");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        });
    if let Err(error) = spawned {
        tracing::warn!(%error, "failed to spawn Ctrl+C listener");
    }
}

fn site_for(url: &str, override_site: Option<Site>) -> Result<Site, CliRunError> {
    resolve_site(url, override_site).map_err(|e| match &e {
        SourceError::InvalidUrl { input, reason } => CliRunError::InvalidInput(format!(
            "Expected a work or chapter URL, e.g. https://novelfire.net/book/shadow-slave. Invalid: {}: {}. Site-relative paths need --site.",
            input, reason
        )),
        SourceError::UnrecognizedHost { host } => CliRunError::InvalidInput(format!(
            "Unsupported site: {}. Use --site to override; `novelsrc sites` lists the supported ones.",
            host
        )),
        _ => CliRunError::Source(e),
    })
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    if let Command::Sites = args.command {
        let profiles: Vec<&SiteProfile> =
            Site::ALL.iter().map(|s| s.source().profile()).collect();
        return print_json(&profiles);
    }
    if let Command::Filters { site } = args.command {
        return print_json(&site.source().filters());
    }

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let client = build_client(args, config.as_ref())?;

    match &args.command {
        Command::Sites | Command::Filters { .. } => Ok(()),
        Command::Popular { site, page } => {
            let listing = ops::fetch_listing(site.source(), &client, ListingKind::Popular, *page)?;
            print_json(&listing)
        }
        Command::Latest { site, page } => {
            let listing = ops::fetch_listing(site.source(), &client, ListingKind::Latest, *page)?;
            print_json(&listing)
        }
        Command::Search {
            site,
            query,
            filters,
            page,
        } => {
            let source = site.source();
            let mut list = source.filters();
            for (name, value) in filters {
                list = list.with_value(name, value)?;
            }
            let query = query.as_deref().unwrap_or("");
            let listing = ops::search(source, &client, query, &list, *page)?;
            print_json(&listing)
        }
        Command::Details { url, site } => {
            let site = site_for(url, *site)?;
            let work = ops::fetch_details(site.source(), &client, url)?;
            print_json(&work)
        }
        Command::Chapters { url, site } => {
            let site = site_for(url, *site)?;
            let policy = config
                .as_ref()
                .map(|c| c.pagination.policy())
                .unwrap_or_default();

            let spinner: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
            let progress_cb = |page: u32, total: usize| {
                let mut state = spinner.borrow_mut();
                let pb = state.get_or_insert_with(|| {
                    let bar = indicatif::ProgressBar::new_spinner();
                    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                        .template("{spinner} {msg} ({elapsed})")
                    {
                        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
                    }
                    bar.enable_steady_tick(Duration::from_millis(80));
                    bar
                });
                pb.set_message(format!("Page {}: {} chapters", page, total));
            };
            let progress: Option<&dyn Fn(u32, usize)> = if args.quiet {
                None
            } else {
                Some(&progress_cb)
            };
            let cancel = CancelFlag::new();
            cancel_on_interrupt(cancel.clone());
            let options = ChapterListOptions {
                policy,
                cancel,
                progress,
                ..ChapterListOptions::default()
            };
            let run = ops::fetch_chapter_list(site.source(), &client, url, &options);

            if let Some(pb) = spinner.borrow_mut().take() {
                pb.disable_steady_tick();
                pb.finish_and_clear();
            }
            match run.stop {
                StopReason::Exhausted => {}
                StopReason::FailureCap => eprintln!(
                    "Warning: gave up after {} failed fetches; list is truncated at {} chapters.",
                    run.failures,
                    run.chapters.len()
                ),
                StopReason::Cancelled => eprintln!(
                    "Warning: interrupted; list is partial at {} chapters.",
                    run.chapters.len()
                ),
            }
            print_json(&run.chapters)
        }
        Command::Read { url, site, format } => {
            let site = site_for(url, *site)?;
            let content = ops::fetch_chapter_content(site.source(), &client, url)?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", render_chapter(&content, *format))
                .map_err(|e| CliRunError::Output(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_site_by_id() -> Result<(), String> {
        assert_eq!(parse_site("novelfire")?, Site::NovelFire);
        assert_eq!(parse_site("NovelBin")?, Site::NovelBin);
        assert_eq!(parse_site("freewebnovel")?, Site::FreeWebNovel);
        assert_eq!(parse_site("nova")?, Site::Nova);
        Ok(())
    }

    #[test]
    fn parse_site_invalid_lists_ids() {
        match parse_site("royalroad") {
            Err(msg) => assert!(msg.contains("novelfire, novelbin, freewebnovel, nova")),
            Ok(site) => panic!("unexpected site {:?}", site),
        }
    }

    #[test]
    fn parse_filter_arg_splits_once() -> Result<(), String> {
        assert_eq!(
            parse_filter_arg("Genres=Action,Fantasy")?,
            ("Genres".to_string(), "Action,Fantasy".to_string())
        );
        assert_eq!(
            parse_filter_arg(" Rating Value (Max 5) = 4 ")?,
            ("Rating Value (Max 5)".to_string(), "4".to_string())
        );
        assert_eq!(
            parse_filter_arg("Sort Results By=Title A>Z")?.1,
            "Title A>Z".to_string()
        );
        assert!(parse_filter_arg("Genres").is_err());
        assert!(parse_filter_arg("=x").is_err());
        Ok(())
    }

    #[test]
    fn parse_formats() -> Result<(), String> {
        assert_eq!(parse_read_format("md")?, ReadFormat::Markdown);
        assert_eq!(parse_read_format("TEXT")?, ReadFormat::Text);
        assert!(parse_read_format("pdf").is_err());
        assert_eq!(parse_log_format("json")?, LogFormat::Json);
        assert!(parse_log_format("xml").is_err());
        Ok(())
    }

    #[test]
    fn args_parse_search_with_filters() -> Result<(), clap::Error> {
        let args = Args::try_parse_from([
            "novelsrc",
            "-vv",
            "search",
            "--site",
            "novelfire",
            "--filter",
            "Genres=Action",
            "--filter",
            "Translation Status=Completed",
            "--page",
            "2",
        ])?;
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Search {
                site,
                query,
                filters,
                page,
            } => {
                assert_eq!(site, Site::NovelFire);
                assert!(query.is_none());
                assert_eq!(filters.len(), 2);
                assert_eq!(page, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn plain_text_keeps_paragraph_breaks() {
        assert_eq!(
            body_to_plain_text("<p>One.</p><p> Two. </p>"),
            "One.\n\nTwo."
        );
        assert_eq!(body_to_plain_text("just text"), "just text");
        assert_eq!(body_to_plain_text("   "), "");
    }

    #[test]
    fn markdown_rendering_drops_tags() {
        let content = ChapterContent {
            url: "/c/1".into(),
            html: "<p>Hello <em>there</em>.</p>".into(),
        };
        let md = render_chapter(&content, ReadFormat::Markdown);
        assert!(!md.contains("<p>"));
        assert!(md.contains("Hello"));
        assert_eq!(render_chapter(&content, ReadFormat::Html), content.html);
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Source(SourceError::validation("Rating", "out of range")).exit_code(),
            1
        );
        assert_eq!(
            CliRunError::Source(SourceError::UnrecognizedHost { host: "x".into() }).exit_code(),
            1
        );
        assert_eq!(
            CliRunError::Source(SourceError::HttpStatus {
                status: 404,
                url: "https://novelbin.com/x".into()
            })
            .exit_code(),
            2
        );
        assert_eq!(CliRunError::Output("closed".into()).exit_code(), 3);
    }

    #[test]
    fn client_defaults_come_from_http_layer() -> Result<(), Box<dyn std::error::Error>> {
        let args = Args::try_parse_from(["novelsrc", "sites"])?;
        let client = build_client(&args, None)?;
        assert_eq!(client.delay(), Duration::from_millis(DEFAULT_DELAY_MS));

        let config = Config {
            request_delay_ms: Some(750),
            ..Config::default()
        };
        let client = build_client(&args, Some(&config))?;
        assert_eq!(client.delay(), Duration::from_millis(750));

        let args = Args::try_parse_from(["novelsrc", "--delay", "0", "sites"])?;
        let client = build_client(&args, Some(&config))?;
        assert_eq!(client.delay(), Duration::ZERO);
        Ok(())
    }
}
