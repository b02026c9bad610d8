use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::feed::parser::{parse_items, FeedItem, ParseError};
use crate::util::{clean_description, extract_image_url};

/// Title shown for items that have none.
pub const UNTITLED: &str = "No title";

/// One feed item, normalized for display.
///
/// Records are created fresh on every fetch and are never updated in place.
/// Serializes to the camelCase shape consumed by the web front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Batch-scoped identifier, `article-{index}-{millis}`
    pub id: String,
    pub title: String,
    /// Canonical source URL. Empty when the item has no link, never missing.
    pub link: String,
    /// Plain text: markup stripped, whitespace collapsed
    pub description: String,
    /// Publication timestamp as supplied by the feed
    pub pub_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub categories: Vec<String>,
    /// Rich HTML body, or the raw description when the feed has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Article {
    /// Projects a raw feed item into an article.
    pub fn from_item(item: FeedItem, id: String) -> Self {
        let raw_description = item.description.unwrap_or_default();

        let content = non_empty(item.content_encoded)
            .or_else(|| non_empty(item.encoded))
            .or_else(|| non_empty(Some(raw_description.clone())));

        let image_url = content
            .as_deref()
            .and_then(extract_image_url)
            .or_else(|| extract_image_url(&raw_description));

        let categories = item
            .categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            id,
            title: trimmed(item.title).unwrap_or_else(|| UNTITLED.to_string()),
            link: trimmed(item.link).unwrap_or_default(),
            description: clean_description(&raw_description),
            pub_date: trimmed(item.pub_date).unwrap_or_default(),
            creator: trimmed(item.dc_creator).or_else(|| trimmed(item.creator)),
            categories,
            content,
            image_url,
        }
    }

    /// Identity that survives reloads.
    ///
    /// `id` only distinguishes records within one batch. The link is the
    /// natural key, so this hashes the link, falling back to the title for
    /// items without one.
    pub fn stable_key(&self) -> String {
        let basis = if self.link.is_empty() {
            &self.title
        } else {
            &self.link
        };
        format!("{:x}", Sha256::digest(basis.as_bytes()))
    }
}

/// Builds the batch identifier for the article at `index`.
pub fn batch_id(index: usize, stamp_millis: i64) -> String {
    format!("article-{}-{}", index, stamp_millis)
}

/// Parses a feed document into articles, in feed order.
///
/// This is the fetch pipeline minus the network: every item becomes exactly
/// one article, and all articles of a call share the same timestamp in their
/// `id`.
pub fn parse_articles(xml: &str) -> Result<Vec<Article>, ParseError> {
    let stamp = chrono::Utc::now().timestamp_millis();
    let articles = parse_items(xml)?
        .into_iter()
        .enumerate()
        .map(|(index, item)| Article::from_item(item, batch_id(index, stamp)))
        .collect();
    Ok(articles)
}
