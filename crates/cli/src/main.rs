//! Glowbook CLI: provider search, recent and saved searches, and default
//! filters from the terminal.
//!
//! Drives `glowbook-core` directly against the provider API, with history kept
//! in JSON files under the data directory.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use glowbook_core::api::HttpSearchApi;
use glowbook_core::{
    build_orchestrator_with_queue, filter_display_text, load_search_config, FileStore,
    HistoryStore, KeyValueStore, PreferenceStore, SearchApi, SearchConfig, SearchFilters,
    SearchOrchestrator, SearchSnapshot, ServiceProvider, SortBy, SortOrder, WriteQueue,
};

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Glowbook CLI: find beauty providers and manage your searches.
#[derive(Parser)]
#[command(name = "glowbook", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Directory for history, saved searches, preferences, and .glowbook.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search providers
    Search {
        /// Free-text query (fewer than 3 characters and no filters shows featured providers)
        query: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        api: ApiArgs,

        /// Number of result pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,

        /// Save this search under the given name
        #[arg(long, value_name = "NAME")]
        save: Option<String>,

        /// Store these filters as the default for future sessions
        #[arg(long)]
        save_default: bool,
    },
    /// List or clear recent searches
    Recent {
        /// Forget all recent searches
        #[arg(long)]
        clear: bool,
    },
    /// Manage saved searches
    Saved {
        #[command(subcommand)]
        action: SavedCommand,
    },
    /// Show or change default filters
    Prefs {
        #[command(subcommand)]
        action: PrefsCommand,
    },
}

#[derive(Subcommand)]
enum SavedCommand {
    /// List saved searches, newest first
    List,
    /// Save a named search
    Add {
        /// Display name
        name: String,

        /// Free-text query
        query: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Delete a saved search by id
    Delete { id: String },
    /// Run a saved search
    Run {
        id: String,

        #[command(flatten)]
        api: ApiArgs,

        /// Number of result pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// Show the default filters
    Show,
    /// Replace the default filters
    Set {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Remove the default filters
    Reset,
}

#[derive(Args)]
struct FilterArgs {
    /// Service category, e.g. "Hair" ("All" means any)
    #[arg(long)]
    category: Option<String>,

    /// Location text
    #[arg(long)]
    location: Option<String>,

    /// Lowest starting price
    #[arg(long)]
    price_min: Option<f64>,

    /// Highest starting price
    #[arg(long)]
    price_max: Option<f64>,

    /// Minimum star rating (1-5)
    #[arg(long, value_parser = parse_rating)]
    min_rating: Option<f64>,

    /// Distance label, e.g. "5 mi"
    #[arg(long)]
    distance: Option<String>,

    /// Only providers available today
    #[arg(long)]
    today: bool,

    /// Only providers available this week
    #[arg(long)]
    this_week: bool,

    /// Sort field: price, rating, distance, availability, name
    #[arg(long)]
    sort: Option<SortBy>,

    /// Sort direction: asc or desc (default depends on the field)
    #[arg(long)]
    order: Option<SortOrder>,
}

impl FilterArgs {
    fn into_filters(self) -> SearchFilters {
        SearchFilters {
            category: self.category,
            location: self.location,
            price_min: self.price_min,
            price_max: self.price_max,
            rating: self.min_rating,
            distance: self.distance,
            available_today: self.today.then_some(true),
            available_this_week: self.this_week.then_some(true),
            sort_by: self.sort,
            sort_order: self.order,
        }
    }
}

#[derive(Args)]
struct ApiArgs {
    /// Base URL of the provider API (overrides api_url in .glowbook.toml)
    #[arg(long, env = "GLOWBOOK_API_URL")]
    api_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "GLOWBOOK_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
}

fn parse_rating(s: &str) -> Result<f64, String> {
    let rating: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (1.0..=5.0).contains(&rating) {
        Ok(rating)
    } else {
        Err(format!("rating must be between 1 and 5, got {s}"))
    }
}

// ---------------------------------------------------------------------------
// Session wiring
// ---------------------------------------------------------------------------

struct Session {
    store: Arc<dyn KeyValueStore>,
    writes: Arc<WriteQueue>,
    config: SearchConfig,
}

impl Session {
    fn open(data_dir: Option<PathBuf>) -> CliResult<Self> {
        let dir = data_dir
            .or_else(glowbook_core::data_dir)
            .ok_or("Could not determine a data directory; pass --data-dir")?;
        let config = load_search_config(&dir);
        tracing::debug!(dir = %dir.display(), "Opened data directory");
        Ok(Self { store: Arc::new(FileStore::new(dir)), writes: Arc::new(WriteQueue::new()), config })
    }

    fn history(&self) -> HistoryStore {
        HistoryStore::with_queue(
            Arc::clone(&self.store),
            Arc::clone(&self.writes),
            self.config.recent_limit,
        )
    }

    fn preferences(&self) -> PreferenceStore {
        PreferenceStore::with_queue(Arc::clone(&self.store), Arc::clone(&self.writes))
    }

    fn orchestrator(&self, args: &ApiArgs) -> CliResult<SearchOrchestrator> {
        let url = args
            .api_url
            .clone()
            .or_else(|| self.config.api_url.clone())
            .ok_or("No API URL: pass --api-url, set GLOWBOOK_API_URL, or add api_url to .glowbook.toml")?;

        let mut api = HttpSearchApi::new(&url, self.config.request_timeout())?;
        if let Some(token) = &args.api_token {
            api = api.with_token(token.clone());
        }
        let api: Arc<dyn SearchApi> = Arc::new(api);
        Ok(build_orchestrator_with_queue(
            Arc::clone(&self.store),
            Arc::clone(&self.writes),
            api,
            self.config.clone(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json(value: &impl Serialize) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn chips_text(filters: &SearchFilters) -> String {
    let chips = filter_display_text(filters);
    if chips.is_empty() {
        String::new()
    } else {
        format!("[{}]", chips.join(", "))
    }
}

fn availability(p: &ServiceProvider) -> &'static str {
    if p.available_today == Some(true) {
        "today"
    } else if p.available_this_week == Some(true) {
        "this week"
    } else {
        ""
    }
}

fn print_providers(snapshot: &SearchSnapshot) {
    for p in &snapshot.results {
        let rating = p.rating.map(|r| format!("{r:.1}")).unwrap_or_else(|| "-".into());
        let price = p.price_from.map(|v| format!("${v:.0}+")).unwrap_or_else(|| "-".into());
        let distance = p.distance.map(|d| format!("{d:.1} mi")).unwrap_or_else(|| "-".into());
        println!(
            "{:<30} {:<10} {:>4} {:>7} {:>8}  {}",
            p.name,
            p.category.as_deref().unwrap_or("-"),
            rating,
            price,
            distance,
            availability(p)
        );
    }
}

/// Page forward through the settled search and print it.
async fn show_results(orchestrator: &SearchOrchestrator, pages: u32, json: bool) -> CliResult {
    for _ in 1..pages {
        let before = orchestrator.snapshot().page;
        orchestrator.load_more().await;
        if orchestrator.snapshot().page == before {
            break;
        }
    }

    let snapshot = orchestrator.snapshot();
    if json {
        print_json(&snapshot)?;
    } else {
        let chips = orchestrator.filter_chips();
        if !chips.is_empty() {
            eprintln!("Filters: {}\n", chips.join(", "));
        }
        if snapshot.results.is_empty() && snapshot.notice.is_none() {
            eprintln!("No providers found");
        }
        print_providers(&snapshot);
        if !snapshot.results.is_empty() {
            let label = if snapshot.query.trim().is_empty() && chips.is_empty() {
                "featured providers"
            } else {
                "providers"
            };
            eprintln!(
                "\n{} of {} {label} (page {} of {})",
                snapshot.results.len(),
                snapshot.total_count,
                snapshot.page,
                snapshot.total_pages.max(1)
            );
        }
    }

    match snapshot.notice {
        Some(notice) => Err(notice.into()),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run(cli: Cli) -> CliResult {
    let session = Session::open(cli.data_dir)?;
    let json = cli.json;

    match cli.command {
        Commands::Search { query, filters, api, pages, save, save_default } => {
            let orchestrator = session.orchestrator(&api)?;
            orchestrator.set_filters(filters.into_filters());
            orchestrator.set_query(query.unwrap_or_default());
            orchestrator.submit().await;
            show_results(&orchestrator, pages, json).await?;

            if let Some(name) = save {
                let saved = orchestrator.save_current_search(&name).await?;
                eprintln!("Saved \"{}\" as {}", saved.name, saved.id);
            }
            if save_default {
                orchestrator.save_current_filters_as_default().await?;
                eprintln!("Saved default filters");
            }
        }
        Commands::Recent { clear } => {
            let history = session.history();
            if clear {
                history.clear_recent_searches().await;
                eprintln!("Cleared recent searches");
                return Ok(());
            }

            let recent = history.recent_searches().await;
            if json {
                print_json(&recent)?;
            } else if recent.is_empty() {
                eprintln!("No recent searches");
            } else {
                for r in &recent {
                    let query = if r.query.is_empty() { "(any)" } else { r.query.as_str() };
                    println!(
                        "{}  {:<24} {}",
                        r.timestamp.format("%Y-%m-%d %H:%M"),
                        query,
                        chips_text(&r.filters)
                    );
                }
            }
        }
        Commands::Saved { action } => {
            let history = session.history();
            match action {
                SavedCommand::List => {
                    let saved = history.saved_searches().await;
                    if json {
                        print_json(&saved)?;
                    } else if saved.is_empty() {
                        eprintln!("No saved searches");
                    } else {
                        for s in &saved {
                            println!("{}  {:<24} {:<20} {}", s.id, s.name, s.query, chips_text(&s.filters));
                        }
                    }
                }
                SavedCommand::Add { name, query, filters } => {
                    let query = query.unwrap_or_default();
                    let saved =
                        history.save_search(&name, query.trim(), &filters.into_filters()).await?;
                    if json {
                        print_json(&saved)?;
                    } else {
                        println!("{}", saved.id);
                    }
                }
                SavedCommand::Delete { id } => {
                    if history.find_saved_search(&id).await.is_none() {
                        eprintln!("No saved search with id {id}");
                    }
                    history.delete_saved_search(&id).await;
                }
                SavedCommand::Run { id, api, pages } => {
                    let saved = history
                        .find_saved_search(&id)
                        .await
                        .ok_or_else(|| format!("No saved search with id {id}"))?;
                    let orchestrator = session.orchestrator(&api)?;
                    if !json {
                        eprintln!("Running \"{}\"", saved.name);
                    }
                    orchestrator.apply_saved_search(&saved).await;
                    show_results(&orchestrator, pages, json).await?;
                }
            }
        }
        Commands::Prefs { action } => {
            let preferences = session.preferences();
            match action {
                PrefsCommand::Show => {
                    let filters = preferences.search_preferences().await;
                    if json {
                        print_json(&filters)?;
                    } else {
                        let chips = filter_display_text(&filters);
                        if chips.is_empty() {
                            eprintln!("No default filters");
                        } else {
                            for chip in chips {
                                println!("{chip}");
                            }
                        }
                    }
                }
                PrefsCommand::Set { filters } => {
                    let filters = filters.into_filters();
                    preferences.save_search_preferences(&filters).await?;
                    eprintln!("Default filters: {}", chips_text(&filters));
                }
                PrefsCommand::Reset => {
                    preferences.reset_search_preferences().await?;
                    eprintln!("Cleared default filters");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("glowbook=warn".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
