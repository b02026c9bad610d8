use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use feedlens::config::Config;
use feedlens::feed::{catalog, try_fetch_feed, Article};
use feedlens::util::{validate_url_for_open, MAX_SEARCH_QUERY_LENGTH};

mod render;

use render::Layout;

#[derive(Parser, Debug)]
#[command(name = "feedlens", about = "Read an RSS feed through a CORS relay")]
struct Args {
    /// Config file (default: ~/.config/feedlens/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Feed URL, overriding the config file
    #[arg(long, value_name = "URL", global = true)]
    feed: Option<String>,

    /// Print articles as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List articles in feed order
    List {
        /// Only show articles whose title, description or tags contain QUERY
        #[arg(long, short, value_name = "QUERY")]
        search: Option<String>,

        /// Show at most N articles
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
    /// Show the featured articles (the first few in feed order)
    Featured,
    /// Show one article by link or key prefix, with related articles
    Show {
        /// Article link, or a prefix of its stable key
        target: String,

        /// Open the article in the browser
        #[arg(long)]
        open: bool,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(feed) = &args.feed {
        config.feed_url = feed.clone();
    }
    Ok(config)
}

fn print_articles<'a>(
    out: &mut impl Write,
    articles: impl IntoIterator<Item = &'a Article>,
    json: bool,
    excerpt_len: usize,
    layout: Layout,
) -> Result<()> {
    if json {
        render::write_json(out, articles)?;
    } else {
        render::write_cards(out, articles, excerpt_len, layout)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let relay = config.relay().context("Invalid relay configuration")?;
    let client = reqwest::Client::new();

    let articles = try_fetch_feed(&client, &relay, &config.feed_url)
        .await
        .with_context(|| format!("Failed to load articles from {}", config.feed_url))?;

    let layout = Layout::from_env(config.date_locale);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::List { search, limit } => {
            let query = search.as_deref().unwrap_or("");
            if query.len() > MAX_SEARCH_QUERY_LENGTH {
                anyhow::bail!("Search query too long (max {MAX_SEARCH_QUERY_LENGTH} bytes)");
            }

            let mut hits = catalog::search(&articles, query);
            if let Some(limit) = limit {
                hits.truncate(*limit);
            }

            if hits.is_empty() && !args.json {
                if query.trim().is_empty() {
                    eprintln!("No articles available.");
                } else {
                    eprintln!("No results for \"{}\".", query.trim());
                }
                return Ok(());
            }

            if !args.json && !query.trim().is_empty() {
                let noun = if hits.len() == 1 { "result" } else { "results" };
                writeln!(out, "{} {} for \"{}\"\n", hits.len(), noun, query.trim())?;
            }
            print_articles(
                &mut out,
                hits,
                args.json,
                config.list_excerpt_length,
                layout,
            )?;
        }
        Command::Featured => {
            let featured = catalog::featured(&articles, config.featured_count);
            if featured.is_empty() && !args.json {
                eprintln!("No articles available.");
                return Ok(());
            }
            print_articles(
                &mut out,
                featured,
                args.json,
                config.featured_excerpt_length,
                layout,
            )?;
        }
        Command::Show { target, open } => {
            let article = catalog::find_by_link(&articles, target)
                .with_context(|| format!("Article not found: {}", target))?;

            if args.json {
                render::write_json(&mut out, [article])?;
            } else {
                let related = catalog::related(&articles, &article.link, config.related_count);
                render::write_detail(
                    &mut out,
                    article,
                    &related,
                    config.list_excerpt_length,
                    layout,
                )?;
            }

            if *open {
                // SEC: Validate URL before open::that() to prevent command injection
                let url = validate_url_for_open(&article.link).map_err(anyhow::Error::msg)?;
                open::that(url.as_str()).context("Failed to open browser")?;
                tracing::info!(link = %url, "Opened article in browser");
            }
        }
    }

    out.flush()?;
    Ok(())
}
