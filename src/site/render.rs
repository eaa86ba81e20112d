//! Static page emission: per-message JSON and HTML, browse-by-year and
//! browse-by-author listings.
//!
//! Markup is deliberately minimal; the pages exist so the corpus is
//! navigable without any server. A failed write is logged and the run
//! continues; one bad path never abandons the rest of the site.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::error::{ArchiveError, Result};
use crate::model::message::CanonicalMessage;
use crate::nav::NavLinks;
use crate::parser::fields::parse_iso;
use crate::parser::sniff::{sniff_body, SniffedBody};

/// Counters for one render run.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub message_pages: u64,
    pub year_pages: u64,
    pub author_pages: u64,
}

/// Per-message JSON payload (full body for display).
#[derive(Serialize)]
struct MessageDoc<'a> {
    id: &'a str,
    subject: &'a str,
    author: &'a str,
    timestamp: Option<&'a str>,
    full_text: &'a str,
}

/// Emit the whole site under `site_dir`.
pub fn write_site(
    messages: &[CanonicalMessage],
    links: &HashMap<String, NavLinks>,
    site_dir: &Path,
) -> Result<RenderStats> {
    let msg_dir = site_dir.join("msg");
    let browse_dir = site_dir.join("browse");
    let authors_dir = browse_dir.join("authors");
    for dir in [&msg_dir, &browse_dir, &authors_dir] {
        std::fs::create_dir_all(dir).map_err(|e| ArchiveError::io(dir, e))?;
    }

    let mut stats = RenderStats::default();

    for msg in messages {
        let doc = MessageDoc {
            id: &msg.id,
            subject: &msg.subject,
            author: &msg.author,
            timestamp: msg.timestamp.as_deref(),
            full_text: &msg.full_text,
        };
        let json_path = msg_dir.join(format!("{}.json", msg.id));
        match serde_json::to_string(&doc) {
            Ok(body) => {
                if let Err(e) = std::fs::write(&json_path, body) {
                    warn!(path = %json_path.display(), error = %e, "Skipping message JSON");
                }
            }
            Err(e) => warn!(id = %msg.id, error = %e, "Skipping unserializable message JSON"),
        }

        let nav = links.get(&msg.id).cloned().unwrap_or_default();
        let html = render_message_page(msg, &nav);
        let html_path = msg_dir.join(format!("{}.html", msg.id));
        match std::fs::write(&html_path, html) {
            Ok(()) => stats.message_pages += 1,
            Err(e) => warn!(path = %html_path.display(), error = %e, "Skipping message page"),
        }
    }

    stats.year_pages = write_year_pages(messages, &browse_dir);
    stats.author_pages = write_author_pages(messages, &authors_dir);
    write_browse_index(messages, &browse_dir);

    Ok(stats)
}

/// Render one message page with its navigation links.
pub fn render_message_page(msg: &CanonicalMessage, nav: &NavLinks) -> String {
    let subject = display_subject(msg);
    let author = display_author(msg);
    let date = msg
        .timestamp
        .as_deref()
        .map(pretty_date)
        .unwrap_or_default();

    let mut nav_buttons: Vec<String> = Vec::new();
    let mut push_link = |id: &Option<String>, label: &str| {
        if let Some(id) = id {
            nav_buttons.push(format!(
                "<a href=\"../msg/{}.html\">{label}</a>",
                urlencoding::encode(id)
            ));
        }
    };
    push_link(&nav.prev_chrono, "Prev");
    push_link(&nav.next_chrono, "Next");
    push_link(&nav.prev_in_thread, "Prev in thread");
    push_link(&nav.next_in_thread, "Next in thread");
    let nav_html = if nav_buttons.is_empty() {
        String::new()
    } else {
        format!("<p class=\"msg-nav\">{}</p>", nav_buttons.join(" • "))
    };

    let body_html = match sniff_body(&msg.full_text) {
        SniffedBody::Html(markup) => markup,
        SniffedBody::Text(text) => format!(
            "<pre style=\"white-space:pre-wrap;\">{}</pre>",
            escape_html(&text)
        ),
    };

    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{subject}</title>\n\
         <style>\nbody{{font-family:system-ui,sans-serif;margin:0;background:#fff;}}\n\
         .page{{max-width:880px;margin:3rem auto;padding:0 1rem;}}\n\
         header h1{{font-size:1.25rem;margin:0 0 .25rem 0}}\n\
         header p{{color:#555;margin:.25rem 0 1rem 0}}\n\
         .msg-body{{padding:1rem;border:1px solid #eee;border-radius:6px}}\n\
         .msg-nav{{margin:0 0 1rem 0;color:#444;font-size:.95rem}}\n\
         .msg-nav a{{color:#0366d6;text-decoration:none;margin-right:.5rem}}\n</style>\n\
         </head>\n<body>\n<main class=\"page\">\n<header>\n<h1>{subject}</h1>\n\
         <p>From: {author} • Date: {date}</p>\n</header>\n{nav_html}\n\
         <article class=\"msg-body\">\n{body_html}\n</article>\n</main>\n</body>\n</html>\n",
        subject = escape_html(&subject),
        author = escape_html(&author),
        date = escape_html(&date),
    )
}

/// Browse-by-year pages, newest first within each year.
fn write_year_pages(messages: &[CanonicalMessage], browse_dir: &Path) -> u64 {
    let mut pages = 0;
    for (year, mut group) in group_by_year(messages) {
        group.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let mut items = String::new();
        for msg in &group {
            items.push_str(&format!(
                "<li><a href=\"../msg/{}.html\">{}</a> — {} — {}</li>\n",
                urlencoding::encode(&msg.id),
                escape_html(&display_subject(msg)),
                escape_html(&display_author(msg)),
                escape_html(msg.timestamp.as_deref().unwrap_or("")),
            ));
        }
        let html = listing_page(
            &format!("Messages — {year}"),
            "<p><a href=\"index.html\">Back to browse index</a></p>",
            &items,
        );
        let path = browse_dir.join(format!("{year}.html"));
        match std::fs::write(&path, html) {
            Ok(()) => pages += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping year page"),
        }
    }
    pages
}

/// Per-author pages plus the author index, ordered by message count
/// descending then name.
fn write_author_pages(messages: &[CanonicalMessage], authors_dir: &Path) -> u64 {
    let mut by_author: BTreeMap<String, Vec<&CanonicalMessage>> = BTreeMap::new();
    for msg in messages {
        by_author.entry(display_author(msg)).or_default().push(msg);
    }

    let mut ordered: Vec<(&String, &Vec<&CanonicalMessage>)> = by_author.iter().collect();
    ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    let mut pages = 0;
    let mut index_items = String::new();
    for (author, group) in &ordered {
        let slug = slugify(author);
        let mut sorted: Vec<&&CanonicalMessage> = group.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut items = String::new();
        for msg in sorted {
            items.push_str(&format!(
                "<li><a href=\"../../msg/{}.html\">{}</a> — {}</li>\n",
                urlencoding::encode(&msg.id),
                escape_html(&display_subject(msg)),
                escape_html(msg.timestamp.as_deref().unwrap_or("")),
            ));
        }
        let html = listing_page(
            &format!("Messages by {}", escape_html(author)),
            "<p><a href=\"../index.html\">Back to browse index</a></p>",
            &items,
        );
        let path = authors_dir.join(format!("{slug}.html"));
        match std::fs::write(&path, html) {
            Ok(()) => pages += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping author page"),
        }

        index_items.push_str(&format!(
            "<li><a href=\"{}.html\">{}</a> ({})</li>\n",
            urlencoding::encode(&slug),
            escape_html(author),
            group.len()
        ));
    }

    let index_html = listing_page("Browse by author", "", &index_items);
    let path = authors_dir.join("index.html");
    if let Err(e) = std::fs::write(&path, index_html) {
        warn!(path = %path.display(), error = %e, "Skipping author index");
    }
    pages
}

/// The root browse index: years descending plus the author entry point.
fn write_browse_index(messages: &[CanonicalMessage], browse_dir: &Path) {
    let by_year = group_by_year(messages);
    let mut items = String::new();
    for (year, group) in by_year.iter().rev() {
        items.push_str(&format!(
            "<li><a href=\"{year}.html\">{year}</a> ({})</li>\n",
            group.len()
        ));
    }
    let extra = "<p><a href=\"../index.html\">Search</a></p>\n\
                 <p><a href=\"authors/index.html\">Browse by author</a></p>";
    let html = listing_page("Browse messages", extra, &items);
    let path = browse_dir.join("index.html");
    if let Err(e) = std::fs::write(&path, html) {
        warn!(path = %path.display(), error = %e, "Skipping browse index");
    }
}

/// Group messages under their year label; unknown years land in "unknown".
fn group_by_year(messages: &[CanonicalMessage]) -> BTreeMap<String, Vec<&CanonicalMessage>> {
    let mut by_year: BTreeMap<String, Vec<&CanonicalMessage>> = BTreeMap::new();
    for msg in messages {
        let label = msg
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        by_year.entry(label).or_default().push(msg);
    }
    by_year
}

/// Shared shell for listing pages.
fn listing_page(title: &str, extra: &str, items: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body><main style=\"max-width:880px;margin:1rem auto;padding:0 1rem;\">\n\
         <h1>{title}</h1>\n{extra}\n<ul>\n{items}</ul>\n</main></body></html>\n"
    )
}

/// Subject with fallbacks: first line of the body, then a placeholder.
fn display_subject(msg: &CanonicalMessage) -> String {
    if !msg.subject.trim().is_empty() {
        return msg.subject.clone();
    }
    let preview: String = msg
        .full_text
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .chars()
        .take(120)
        .collect();
    if preview.is_empty() {
        "No subject".to_string()
    } else {
        preview
    }
}

/// Author display name; the corpus keeps empties, rendering does not.
fn display_author(msg: &CanonicalMessage) -> String {
    if msg.author.trim().is_empty() {
        "Unknown".to_string()
    } else {
        msg.author.clone()
    }
}

/// Human date for the header line.
fn pretty_date(timestamp: &str) -> String {
    match parse_iso(timestamp) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => timestamp.to_string(),
    }
}

/// Escape HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Filesystem-safe slug for author names.
fn slugify(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect();
    let cleaned = cleaned.replace('@', "-at-");

    let mut slug = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}
