//! Panelcraft CLI - turn a story into comic panels or pages

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::{Config, LogFormat};
use panelcraft_core::application::{GenerationOrchestrator, RosterService, TaskQueue};
use panelcraft_core::domain::{
    CharacterUpdate, ComicStyle, ItemPhase, LayoutMode, NewCharacter, QueueConfig,
};
use panelcraft_core::port::id_provider::UuidProvider;
use panelcraft_core::port::time_provider::SystemTimeProvider;
use panelcraft_core::port::{ApiKey, ContentService, CredentialStore, RosterStore};
use panelcraft_infra_dashscope::{DashScopeClient, DashScopeConfig, DashScopeContentService};
use panelcraft_infra_sqlite::{
    create_pool, run_migrations, SqliteCredentialStore, SqliteRosterStore,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "panelcraft")]
#[command(about = "Turn a story into comic panels or pages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the DashScope API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage the character roster
    Character {
        #[command(subcommand)]
        action: CharacterAction,
    },

    /// Analyse a story and render every panel or page
    Generate(GenerateArgs),
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the API key (read from stdin when omitted)
    Set { key: Option<String> },
    /// Show whether a key is stored
    Show,
    /// Remove the stored key
    Clear,
}

#[derive(Subcommand)]
enum CharacterAction {
    /// Add a character
    Add {
        name: String,

        /// Appearance and personality
        #[arg(short, long)]
        description: String,

        /// Existing reference image URL
        #[arg(long, conflicts_with = "sheet")]
        image: Option<String>,

        /// Render a front/side/back reference sheet
        #[arg(long)]
        sheet: bool,

        /// Art style of the sheet
        #[arg(long, default_value = "japanese-manga", value_parser = parse_style)]
        style: ComicStyle,

        /// Picture the sheet should follow
        #[arg(long, requires = "sheet")]
        reference: Option<String>,
    },

    /// List all characters in creation order
    List {
        #[arg(long)]
        json: bool,
    },

    /// Search characters by name
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// Show one character
    Show { id: String },

    /// Change fields of a character
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, conflicts_with = "no_image")]
        image: Option<String>,

        /// Remove the reference image
        #[arg(long)]
        no_image: bool,
    },

    /// Delete a character
    Delete { id: String },

    /// Delete every character
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// One image per scene
    Single,
    /// One image per page of several scenes
    Multi,
}

impl From<ModeArg> for LayoutMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => LayoutMode::SinglePanel,
            ModeArg::Multi => LayoutMode::MultiPanel,
        }
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Story file; stdin when omitted or "-"
    input: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "single")]
    mode: ModeArg,

    #[arg(short, long, default_value = "japanese-manga", value_parser = parse_style)]
    style: ComicStyle,

    /// Requests in flight at once (overrides PANELCRAFT_MAX_CONCURRENT)
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Re-render failed items this many times after the batch
    #[arg(long, default_value = "0")]
    retries: u32,

    /// Write the final storyboard as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the final storyboard as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn parse_style(raw: &str) -> Result<ComicStyle, String> {
    raw.parse::<ComicStyle>().map_err(|_| {
        let known: Vec<&str> = ComicStyle::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown style '{raw}' (expected one of: {})", known.join(", "))
    })
}

/// Adapters shared by every command
struct Services {
    roster: Arc<dyn RosterStore>,
    credentials: Arc<dyn CredentialStore>,
    content: Arc<dyn ContentService>,
}

impl Services {
    async fn connect(config: &Config) -> Result<Self> {
        config.ensure_db_dir()?;
        let database_url = config.database_url();
        let pool = create_pool(&database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", database_url, e))?;
        run_migrations(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        debug!(db = %config.db_path.display(), "Database ready");

        let client = DashScopeClient::new(DashScopeConfig {
            base_url: config.api_base.clone(),
            timeout: config.http_timeout,
            ..Default::default()
        })
        .context("Failed to build HTTP client")?;

        Ok(Self {
            roster: Arc::new(SqliteRosterStore::new(pool.clone())),
            credentials: Arc::new(SqliteCredentialStore::new(
                pool,
                Arc::new(SystemTimeProvider),
            )),
            content: Arc::new(DashScopeContentService::new(client)),
        })
    }

    fn roster_service(&self) -> RosterService {
        RosterService::new(
            self.roster.clone(),
            self.content.clone(),
            self.credentials.clone(),
            Arc::new(UuidProvider),
            Arc::new(SystemTimeProvider),
        )
    }

    fn orchestrator(
        &self,
        style: ComicStyle,
        max_concurrent: usize,
    ) -> Result<GenerationOrchestrator> {
        let queue = TaskQueue::new(QueueConfig::new("generation", max_concurrent))?;
        Ok(GenerationOrchestrator::new(
            queue,
            self.content.clone(),
            self.roster.clone(),
            self.credentials.clone(),
            style,
        ))
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("panelcraft=info"))
        .context("Failed to create env filter")?;

    // stdout carries command output, logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_logging(config.log_format)?;
    debug!("Panelcraft v{} starting", VERSION);

    let services = Services::connect(&config).await?;

    match cli.command {
        Commands::Key { action } => run_key(&services, action).await,
        Commands::Character { action } => run_character(&services, action).await,
        Commands::Generate(args) => {
            let max_concurrent = args.max_concurrent.unwrap_or(config.max_concurrent);
            run_generate(&services, args, max_concurrent).await
        }
    }
}

async fn run_key(services: &Services, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { key } => {
            let raw = match key {
                Some(key) => key,
                None => {
                    let mut line = String::new();
                    std::io::stdin()
                        .read_line(&mut line)
                        .context("Failed to read API key from stdin")?;
                    line
                }
            };
            let key = ApiKey::parse(&raw)?;
            services.credentials.set(&key).await?;
            println!("{} API key saved ({})", "✓".green().bold(), key.masked());
        }
        KeyAction::Show => match services.credentials.get().await? {
            Some(key) => println!("{} {}", "API key:".bold(), key.masked()),
            None => println!("{}", "No API key configured".yellow()),
        },
        KeyAction::Clear => {
            services.credentials.clear().await?;
            println!("{} API key removed", "✓".green().bold());
        }
    }
    Ok(())
}

async fn run_character(services: &Services, action: CharacterAction) -> Result<()> {
    let roster = services.roster_service();
    match action {
        CharacterAction::Add {
            name,
            description,
            image,
            sheet,
            style,
            reference,
        } => {
            let new = NewCharacter {
                name,
                description,
                image_url: image,
            };
            let character = if sheet {
                println!("{}", "Rendering reference sheet...".cyan());
                roster.create_with_sheet(new, style, reference).await?
            } else {
                roster.create(new).await?
            };
            println!("{} Character added", "✓".green().bold());
            output::print_character(&character);
        }
        CharacterAction::List { json } => {
            let characters = roster.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&characters)?);
            } else {
                output::print_characters(&characters);
            }
        }
        CharacterAction::Search { query } => {
            output::print_characters(&roster.search(&query).await?);
        }
        CharacterAction::Show { id } => {
            output::print_character(&roster.get(&id).await?);
        }
        CharacterAction::Edit {
            id,
            name,
            description,
            image,
            no_image,
        } => {
            let image_url = if no_image { Some(None) } else { image.map(Some) };
            let character = roster
                .update(
                    &id,
                    CharacterUpdate {
                        name,
                        description,
                        image_url,
                    },
                )
                .await?;
            println!("{} Character updated", "✓".green().bold());
            output::print_character(&character);
        }
        CharacterAction::Delete { id } => {
            if roster.delete(&id).await? {
                println!("{} Character {} deleted", "✓".green().bold(), id);
            } else {
                println!("{}", format!("No character {id}").yellow());
            }
        }
        CharacterAction::Clear { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete every character without --yes");
            }
            let removed = roster.clear().await?;
            println!("{} {} characters deleted", "✓".green().bold(), removed);
        }
    }
    Ok(())
}

fn read_story(input: Option<&PathBuf>) -> Result<String> {
    match input.filter(|path| path.as_os_str() != "-") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read story from stdin")?;
            Ok(text)
        }
    }
}

async fn run_generate(
    services: &Services,
    args: GenerateArgs,
    max_concurrent: usize,
) -> Result<()> {
    let text = read_story(args.input.as_ref())?;
    let orchestrator = services.orchestrator(args.style, max_concurrent)?;

    eprintln!("{}", "Analysing story...".cyan().bold());
    let summary = orchestrator.analyze(&text, args.mode.into()).await?;
    eprintln!(
        "  {} {} items, {} scenes, characters: {}",
        "•".bold(),
        summary.items,
        summary.scenes,
        if summary.characters.is_empty() {
            "none".to_string()
        } else {
            summary.characters.join(", ")
        }
    );

    eprintln!(
        "{}",
        format!("Rendering with up to {max_concurrent} requests in flight...")
            .cyan()
            .bold()
    );
    let progress = orchestrator
        .queue()
        .subscribe(|status| eprintln!("  {} {}", "…".dimmed(), status));
    let report = orchestrator.generate_all().await?;
    progress.unsubscribe();

    for attempt in 1..=args.retries {
        let failed: Vec<usize> = failed_items(&orchestrator);
        if failed.is_empty() {
            break;
        }
        info!(attempt, items = failed.len(), "Retrying failed items");
        for index in failed {
            if let Err(e) = orchestrator.regenerate_item(index).await {
                warn!(index, error = %e, "Retry failed");
            }
        }
    }

    let board = orchestrator.storyboard();
    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&board)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("  {} storyboard written to {}", "•".bold(), path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        output::print_storyboard(&board);
        output::print_report(&report);
        let still_failed = failed_items(&orchestrator).len();
        if args.retries > 0 && still_failed < report.status.failed {
            println!(
                "  {} after retries: {} still failing",
                "•".bold(),
                still_failed
            );
        }
    }
    Ok(())
}

fn failed_items(orchestrator: &GenerationOrchestrator) -> Vec<usize> {
    let board = orchestrator.storyboard();
    (0..board.len())
        .filter(|&index| {
            board
                .item_state(index)
                .is_some_and(|state| state.phase() == ItemPhase::Failed)
        })
        .collect()
}
