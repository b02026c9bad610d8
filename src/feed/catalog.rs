//! Read-side views over one fetched batch of articles.
//!
//! A batch is small (a single feed), so every view is a linear scan that
//! borrows from the slice it was given.

use crate::feed::Article;

/// Number of articles in the featured selection.
pub const DEFAULT_FEATURED_COUNT: usize = 5;
/// Number of related articles shown under an article.
pub const DEFAULT_RELATED_COUNT: usize = 3;
/// Shortest stable-key prefix accepted by [`find_by_link`].
pub const MIN_KEY_PREFIX: usize = 8;

/// Filters articles by a case-insensitive substring of title, description or
/// any category.
///
/// A blank query matches everything.
pub fn search<'a>(articles: &'a [Article], query: &str) -> Vec<&'a Article> {
    let query = query.trim();
    if query.is_empty() {
        return articles.iter().collect();
    }

    let needle = query.to_lowercase();
    articles
        .iter()
        .filter(|a| {
            a.title.to_lowercase().contains(&needle)
                || a.description.to_lowercase().contains(&needle)
                || a
                    .categories
                    .iter()
                    .any(|c| c.to_lowercase().contains(&needle))
        })
        .collect()
}

/// The first `count` articles in feed order.
pub fn featured(articles: &[Article], count: usize) -> &[Article] {
    &articles[..count.min(articles.len())]
}

/// Looks up an article by its link.
///
/// Also accepts a prefix of [`Article::stable_key`] of at least
/// [`MIN_KEY_PREFIX`] characters, which is easier to type than a URL. An
/// ambiguous prefix matches nothing.
pub fn find_by_link<'a>(articles: &'a [Article], link: &str) -> Option<&'a Article> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    if let Some(found) = articles.iter().find(|a| a.link == link) {
        return Some(found);
    }

    let is_key_prefix =
        link.len() >= MIN_KEY_PREFIX && link.chars().all(|c| c.is_ascii_hexdigit());
    if !is_key_prefix {
        return None;
    }

    let prefix = link.to_ascii_lowercase();
    let mut matches = articles.iter().filter(|a| a.stable_key().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Up to `count` other articles to show next to the one at `link`.
pub fn related<'a>(articles: &'a [Article], link: &str, count: usize) -> Vec<&'a Article> {
    articles
        .iter()
        .filter(|a| a.link != link)
        .take(count)
        .collect()
}
