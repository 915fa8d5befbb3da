//! countrydle server binary.
//!
//! Reads `countrydle.toml` (or the path given with `--config`) layered under
//! `COUNTRYDLE_*` environment variables, then runs one of:
//!
//! ```text
//! countrydle seed --catalog data/catalog.json   # load missing countries
//! countrydle add-user alice                     # password read from stdin
//! countrydle serve                              # run the game API
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use countrydle_api::{Game, auth::hash_password};
use countrydle_core::{oracle::VectorIndex, store::GameStore, user::NewUser};
use countrydle_oracle::OpenAiClient;
use countrydle_server::{
  ServerConfig,
  config::{self, IndexKind, expand_tilde},
  index::{AnyIndex, init_index, populate},
  jobs,
  retry::with_retry,
  seed,
};
use countrydle_store_sqlite::SqliteStore;
use rand::{SeedableRng, rngs::StdRng};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Countrydle game server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "countrydle.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the game API and run the daily jobs.
  Serve,
  /// Load the country catalog and embed its fragments. Countries already
  /// stored under the same name are skipped.
  Seed {
    #[arg(long)]
    catalog: PathBuf,
  },
  /// Create a player. The password is read from stdin.
  AddUser {
    username: String,
    /// Leave the account unverified; its streak is then never reset.
    #[arg(long)]
    unverified: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = config::load(&cli.config)?;

  match cli.command {
    Command::Serve => serve(config).await,
    Command::Seed { catalog } => seed_catalog(config, &catalog).await,
    Command::AddUser { username, unverified } => add_user(config, username, !unverified).await,
  }
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&config.store_path);
  let path = store_path.as_path();
  with_retry("open store", config.startup_retry, move || SqliteStore::open(path))
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let job_at = config.job_time()?;
  let store = Arc::new(open_store(&config).await?);
  let model = Arc::new(OpenAiClient::new(config.llm.clone()).context("building LLM client")?);
  let index = Arc::new(AnyIndex::from_config(&config.index).context("building vector index")?);

  let (store_ref, index_ref, index_cfg) = (store.as_ref(), index.as_ref(), &config.index);
  let init = with_retry("initialise vector index", config.startup_retry, move || {
    init_index(index_ref, store_ref, index_cfg)
  })
  .await?;
  info!(?init, "vector index ready");

  let horizon = config.round_horizon_days;
  with_retry("schedule rounds", config.startup_retry, move || async move {
    let mut rng = StdRng::from_entropy();
    jobs::run_daily(store_ref, Utc::now().date_naive(), horizon, &mut rng).await
  })
  .await
  .context("failed to schedule rounds; is the catalog seeded?")?;

  tokio::spawn(jobs::daily_loop(store.clone(), job_at, horizon));

  let game = Arc::new(Game::new(store, model, index));
  let app = countrydle_api::api_router(game);
  let address = format!("{}:{}", config.host, config.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn seed_catalog(config: ServerConfig, catalog: &Path) -> anyhow::Result<()> {
  let countries = seed::load_catalog(catalog)?;
  let store = open_store(&config).await?;
  let model = OpenAiClient::new(config.llm.clone()).context("building LLM client")?;

  let report = seed::seed(&store, &model, countries).await?;
  info!(
    added = report.added,
    skipped = report.skipped,
    fragments = report.fragments,
    "catalog seeded"
  );

  // A persistent collection is not rebuilt at startup, so top it up here.
  if config.index.kind == IndexKind::Qdrant {
    let index = AnyIndex::from_config(&config.index)?;
    if index.collection_exists().await? {
      let upserted = populate(&index, &store).await?;
      info!(upserted, "vector collection updated");
    }
  }
  Ok(())
}

async fn add_user(config: ServerConfig, username: String, verified: bool) -> anyhow::Result<()> {
  let password = read_password()?;
  if password.is_empty() {
    anyhow::bail!("password must not be empty");
  }
  let password_hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;

  let store = open_store(&config).await?;
  let user = store
    .add_user(NewUser { username: username.clone(), password_hash, verified })
    .await
    .with_context(|| format!("failed to add user {username}"))?;
  info!(user_id = %user.user_id, username = %user.username, verified, "user created");
  Ok(())
}

/// Read one line from stdin as the password.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
