//! Fetches an RSS feed through a CORS relay and turns its items into clean
//! article records for display.

pub mod config;
pub mod feed;
pub mod util;
