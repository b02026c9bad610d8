//! Feed ingestion: relay fetch, XML parsing and projection to [`Article`].
//!
//! - `parser` - streaming `quick-xml` reader that extracts raw item fields
//! - `article` - the normalized record and its derived display fields
//! - `fetcher` - HTTP retrieval through a CORS relay
//! - [`catalog`] - search, featured and related views over a fetched batch
//!
//! # Example
//!
//! ```ignore
//! use feedlens::feed::{fetch_feed, try_fetch_feed, Relay};
//!
//! let client = reqwest::Client::new();
//! let relay = Relay::default();
//!
//! // Typed result: empty feed and failed fetch are distinguishable
//! let articles = try_fetch_feed(&client, &relay, "https://example.com/rss").await?;
//!
//! // Display path: failures are logged and yield an empty list
//! let articles = fetch_feed(&client, &relay, "https://example.com/rss").await;
//! ```

mod article;
pub mod catalog;
mod fetcher;
mod parser;

pub use article::{batch_id, parse_articles, Article, UNTITLED};
pub use fetcher::{fetch_feed, try_fetch_feed, FetchError, Relay};
pub use parser::{parse_items, FeedItem, ParseError};
