//! Plain-text rendering of articles for the terminal.
//!
//! Everything taken from the feed passes through `strip_control_chars` before
//! it is written.

use std::io::{self, Write};

use feedlens::feed::Article;
use feedlens::util::{
    clean_description, create_excerpt, display_width, format_date_in, strip_control_chars,
    truncate_to_width, DateLocale,
};

const DEFAULT_WIDTH: usize = 100;
const MIN_WIDTH: usize = 40;
const INDENT: &str = "    ";

/// Layout settings shared by all views.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub width: usize,
    pub locale: DateLocale,
}

impl Layout {
    /// Uses `$COLUMNS` when the shell exports it.
    pub fn from_env(locale: DateLocale) -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_WIDTH)
            .max(MIN_WIDTH);
        Self { width, locale }
    }
}

/// Unparseable dates are echoed verbatim, so the label is stripped too.
fn date_label(article: &Article, locale: DateLocale) -> String {
    if article.pub_date.is_empty() {
        return String::new();
    }
    strip_control_chars(&format_date_in(&article.pub_date, locale)).into_owned()
}

/// One card per article: date and title on the first line, excerpt below.
pub fn write_cards<'a, W: Write>(
    out: &mut W,
    articles: impl IntoIterator<Item = &'a Article>,
    excerpt_len: usize,
    layout: Layout,
) -> io::Result<()> {
    for article in articles {
        let title = strip_control_chars(&article.title);
        let date = date_label(article, layout.locale);
        let heading = if date.is_empty() {
            title.into_owned()
        } else {
            format!("{date}  {title}")
        };
        writeln!(out, "{}", truncate_to_width(&heading, layout.width))?;

        let excerpt = create_excerpt(&article.description, excerpt_len);
        if !excerpt.is_empty() {
            let body_width = layout.width.saturating_sub(INDENT.len());
            for line in wrap(&strip_control_chars(&excerpt), body_width) {
                writeln!(out, "{INDENT}{line}")?;
            }
        }

        if !article.categories.is_empty() {
            let tags: Vec<_> = article
                .categories
                .iter()
                .take(3)
                .map(|c| format!("#{}", strip_control_chars(c)))
                .collect();
            writeln!(out, "{INDENT}{}", tags.join(" "))?;
        }
        if !article.link.is_empty() {
            writeln!(out, "{INDENT}{}", strip_control_chars(&article.link))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Full view of a single article followed by related ones.
pub fn write_detail<W: Write>(
    out: &mut W,
    article: &Article,
    related: &[&Article],
    excerpt_len: usize,
    layout: Layout,
) -> io::Result<()> {
    if !article.categories.is_empty() {
        let tags: Vec<_> = article
            .categories
            .iter()
            .map(|c| format!("[{}]", strip_control_chars(c)))
            .collect();
        writeln!(out, "{}", tags.join(" "))?;
    }

    writeln!(out, "{}", strip_control_chars(&article.title))?;
    writeln!(out, "{}", "=".repeat(layout.width.min(article.title.chars().count().max(1))))?;

    let mut meta = Vec::new();
    if let Some(creator) = &article.creator {
        meta.push(strip_control_chars(creator).into_owned());
    }
    let date = date_label(article, layout.locale);
    if !date.is_empty() {
        meta.push(date);
    }
    if !meta.is_empty() {
        writeln!(out, "{}", meta.join(" · "))?;
    }
    if let Some(image) = &article.image_url {
        writeln!(out, "Image: {}", strip_control_chars(image))?;
    }
    writeln!(out)?;

    let body = match &article.content {
        Some(html) => clean_description(html),
        None => article.description.clone(),
    };
    for line in wrap(&strip_control_chars(&body), layout.width) {
        writeln!(out, "{line}")?;
    }

    if !article.link.is_empty() {
        writeln!(out)?;
        writeln!(out, "Source: {}", strip_control_chars(&article.link))?;
    }

    if !related.is_empty() {
        writeln!(out)?;
        writeln!(out, "Related")?;
        writeln!(out, "-------")?;
        write_cards(out, related.iter().copied(), excerpt_len, layout)?;
    }
    Ok(())
}

/// Articles as a JSON array, in the shape web consumers expect.
pub fn write_json<'a, W: Write>(
    out: &mut W,
    articles: impl IntoIterator<Item = &'a Article>,
) -> io::Result<()> {
    let articles: Vec<&Article> = articles.into_iter().collect();
    serde_json::to_writer_pretty(&mut *out, &articles)?;
    writeln!(out)
}

/// Greedy word wrap on spaces. Words longer than `width` get their own line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && display_width(&line) + 1 + display_width(word) > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
