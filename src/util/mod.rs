//! Utility functions shared by the feed pipeline and the CLI.
//!
//! - **Text processing**: description cleaning, image extraction, excerpts,
//!   terminal width truncation and control-character stripping
//! - **Dates**: lenient feed timestamp parsing and localized long-form output
//! - **URL validation**: SSRF policy for feed URLs and links opened in a browser
//!
//! # Examples
//!
//! ```
//! use feedlens::util::{clean_description, create_excerpt, format_date};
//!
//! let text = clean_description("<p>Windkraft an der <b>Westküste</b></p>");
//! assert_eq!(text, "Windkraft an der Westküste");
//! assert_eq!(create_excerpt(&text, 12), "Windkraft an...");
//! assert_eq!(format_date("2024-05-01"), "1. Mai 2024");
//! ```

mod date;
mod text;
mod url_validator;

pub use date::{format_date, format_date_in, parse_pub_date, DateLocale};
pub use text::{
    clean_description, create_excerpt, display_width, extract_image_url, strip_control_chars,
    truncate_to_width, DEFAULT_EXCERPT_LENGTH,
};
pub use url_validator::{validate_url, validate_url_for_open, UrlValidationError};

/// Maximum accepted search query length.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
