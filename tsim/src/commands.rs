//! CLI command implementations.

use std::path::Path;

use lens::browse::SessionState;
use lens::{
    Browser, Config, LoadingType, NavigationType, Notification, QueryParser, Session, SessionId,
};
use serde_json::{json, Value};
use tsim::{Dataset, Error, MemoryBackend, Result};

fn load_dataset(data: Option<&Path>) -> Result<Dataset> {
    match data {
        Some(path) => Dataset::load(path),
        None => Ok(Dataset::sample()),
    }
}

/// Parse a query and print its canonical form or term tree.
pub fn parse(query: &str, allow: &[String], json_output: bool) -> Result<()> {
    let parser = QueryParser::new().with_allowed_identifiers(allow.iter().cloned());
    let parsed = parser.parse(query)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else if parsed.is_empty() {
        println!("(empty query)");
    } else {
        println!("{}", parsed);
    }
    Ok(())
}

/// List the content types of a dataset.
pub fn types(data: Option<&Path>) -> Result<()> {
    let dataset = load_dataset(data)?;

    println!("{:<16} {:>6}  {:<16} IDENTIFIERS", "TYPE", "ROWS", "CHILD");
    println!("{}", "-".repeat(72));
    for content_type in dataset.content_types() {
        let rows = dataset.records_of(&content_type).count();
        let child = dataset.child_type(&content_type).unwrap_or("-");
        let identifiers: Vec<String> = dataset.identifiers(&content_type).into_iter().collect();
        println!(
            "{:<16} {:>6}  {:<16} {}",
            content_type,
            rows,
            child,
            identifiers.join(",")
        );
    }
    Ok(())
}

pub struct BrowseOptions<'a> {
    /// Dataset file; the built-in sample library if not given.
    pub data: Option<&'a Path>,
    pub content_type: Option<&'a str>,
    pub query: Option<&'a str>,
    /// Rows to drill into, in order, before the query is applied.
    pub forward: &'a [usize],
    pub config: Option<&'a Path>,
    pub count_known: bool,
    pub chunk_size: Option<usize>,
    pub json: bool,
}

/// Open a session on a dataset, navigate, filter, and print every row.
pub fn browse(opts: &BrowseOptions) -> Result<()> {
    let dataset = load_dataset(opts.data)?;

    let mut config = match opts.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    if opts.count_known {
        config.loading_type = LoadingType::CountKnown;
    }
    if let Some(chunk_size) = opts.chunk_size {
        config.chunk_size = chunk_size;
        config.validate()?;
    }

    let content_type = match opts.content_type {
        Some(content_type) => content_type.to_string(),
        None => dataset
            .content_types()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Dataset("dataset has no content types".to_string()))?,
    };

    let mut browser = Browser::with_backend(config, Box::new(MemoryBackend::new(dataset)));
    browser.process_until_idle();
    let id = browser.open_session();

    browser.set_content_type(id, &content_type)?;
    load_all(&mut browser, id)?;

    for index in opts.forward {
        browser.go_forward(id, *index, NavigationType::InModel)?;
        load_all(&mut browser, id)?;
    }

    if let Some(query) = opts.query {
        browser.set_query(id, query)?;
        load_all(&mut browser, id)?;
    }

    let session = browser
        .session(id)
        .ok_or(lens::Error::UnknownSession(id))?;
    if opts.json {
        print_json(session)
    } else {
        print_table(session);
        Ok(())
    }
}

/// Drive the event loop until the session holds every row.
fn load_all(browser: &mut Browser, id: SessionId) -> Result<()> {
    let mut last_missing = None;
    loop {
        browser.process_until_idle();
        let failed = browser
            .take_notifications()
            .contains(&Notification::NavigationFailed { session: id });
        if failed {
            return Err(Error::Dataset("the backend rejected the navigation".to_string()));
        }

        let session = browser
            .session(id)
            .ok_or(lens::Error::UnknownSession(id))?;
        if session.state() == SessionState::SwitchingContentType {
            return Err(Error::Dataset(format!(
                "content type '{}' was not accepted",
                session.requested_content_type()
            )));
        }

        match session.loading_type() {
            LoadingType::FetchMore => {
                if !browser.fetch_more(id)? {
                    return Ok(());
                }
            }
            LoadingType::CountKnown => {
                let missing: Vec<usize> = (0..session.row_count())
                    .filter(|index| session.window().is_placeholder(*index))
                    .collect();
                if missing.is_empty() {
                    return Ok(());
                }
                if last_missing == Some(missing.len()) {
                    return Err(lens::Error::Protocol(format!(
                        "{} rows never arrived",
                        missing.len()
                    ))
                    .into());
                }
                last_missing = Some(missing.len());
                for index in missing {
                    browser.read(id, index)?;
                }
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_table(session: &Session) {
    println!("{} ({} rows)", session.content_type(), session.row_count());
    if !session.query().is_empty() {
        println!("query: {}", session.query());
    }
    println!("{:<5} {:<3} {:<10} {:<32} DATA", "#", "NAV", "ID", "NAME");
    println!("{}", "-".repeat(80));

    for (index, row) in session.window().rows().iter().enumerate() {
        let nav = if session.can_go_forward(index) { ">" } else { "" };
        match row {
            Some(record) => println!(
                "{:<5} {:<3} {:<10} {:<32} {}",
                index,
                nav,
                truncate(&record.id, 10),
                truncate(&record.name, 32),
                Value::Object(record.data.clone())
            ),
            None => println!("{:<5} {:<3} (pending)", index, nav),
        }
    }
}

fn print_json(session: &Session) -> Result<()> {
    let breadcrumbs: Vec<Value> = session
        .breadcrumbs()?
        .into_iter()
        .map(|segment| json!({"type": segment.content_type, "selection": segment.selection}))
        .collect();
    let rows: Vec<_> = session.window().records().collect();

    let output = json!({
        "content_type": session.content_type(),
        "breadcrumbs": breadcrumbs,
        "query": session.query(),
        "row_count": session.row_count(),
        "more_available": session.more_available(),
        "can_go_back": session.can_go_back(),
        "rows": rows,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
