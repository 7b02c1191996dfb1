//! `folio`: administration tool for the Folio publishing store.
//!
//! # Usage
//!
//! ```
//! folio artefact add --name "Register a birth" --slug register-a-birth --kind answer --owning-app publisher
//! folio edition create edition.json
//! folio edition clone 0b6f... --kind answer
//! folio downtime set --artefact 7c1e... --start 2030-10-10T15:00:00Z --end 2030-10-11T18:00:00Z
//! folio factcheck address 0b6f...
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use folio_core::{
  ValidationContext,
  artefact::{ArtefactState, NewArtefact},
  downtime::Downtime,
  edition::{Edition, EditionDetails, EditionKind, EditionUpdate},
  fact_check::FactCheckAddress,
  store::{PublishingStore, validate_edition},
};
use folio_store_sqlite::SqliteStore;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use settings::Settings;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Manage Folio editions and downtime notices")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "folio.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register and inspect artefacts.
  #[command(subcommand)]
  Artefact(ArtefactCommand),
  /// Create, inspect, clone and update editions.
  #[command(subcommand)]
  Edition(EditionCommand),
  /// Schedule and clear downtime notices.
  #[command(subcommand)]
  Downtime(DowntimeCommand),
  /// Build and parse fact-check reply addresses.
  #[command(subcommand)]
  Factcheck(FactcheckCommand),
}

#[derive(Subcommand, Debug)]
enum ArtefactCommand {
  Add {
    #[arg(long)]
    name:       String,
    #[arg(long)]
    slug:       String,
    #[arg(long, default_value = "answer")]
    kind:       String,
    #[arg(long, default_value = "publisher")]
    owning_app: String,
  },
  Show { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum EditionCommand {
  /// Create a first edition from a JSON file.
  Create { file: PathBuf },
  Show { id: Uuid },
  /// Store the next version of an edition, optionally as another format.
  Clone {
    id:   Uuid,
    #[arg(long)]
    kind: Option<EditionKind>,
  },
  /// Report validation failures for a JSON file without storing it.
  Validate { file: PathBuf },
  /// Apply a JSON batch of attribute and nested node changes.
  Update { id: Uuid, patch: PathBuf },
}

#[derive(Subcommand, Debug)]
enum DowntimeCommand {
  /// Create or replace the notice for an artefact.
  Set {
    #[arg(long)]
    artefact: Uuid,
    #[arg(long)]
    start:    DateTime<Utc>,
    #[arg(long)]
    end:      DateTime<Utc>,
    /// Derived from the window when omitted.
    #[arg(long)]
    message:  Option<String>,
  },
  Show {
    #[arg(long)]
    artefact: Uuid,
  },
  Clear {
    #[arg(long)]
    artefact: Uuid,
  },
}

#[derive(Subcommand, Debug)]
enum FactcheckCommand {
  /// Print the reply address for an edition.
  Address { edition: Uuid },
  /// Print the edition id encoded in an inbound address.
  Parse { address: String },
}

// ─── Edition input ────────────────────────────────────────────────────────────

/// Shape of the JSON accepted by `edition create` and `edition validate`.
#[derive(Deserialize, Debug)]
struct EditionInput {
  panopticon_id: Uuid,
  title:         Option<String>,
  slug:          Option<String>,
  details:       EditionDetails,
}

impl EditionInput {
  fn into_edition(self, now: DateTime<Utc>) -> Edition {
    let mut edition = Edition::new(self.panopticon_id, self.details, now);
    edition.title = self.title;
    edition.slug = self.slug;
    edition
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Artefact(cmd) => artefact(&open_store(&settings).await?, cmd).await,
    Command::Edition(cmd) => edition(&open_store(&settings).await?, cmd).await,
    Command::Downtime(cmd) => downtime(&open_store(&settings).await?, cmd).await,
    Command::Factcheck(cmd) => factcheck(&settings, cmd),
  }
}

async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn artefact(store: &SqliteStore, cmd: ArtefactCommand) -> anyhow::Result<()> {
  match cmd {
    ArtefactCommand::Add { name, slug, kind, owning_app } => {
      let artefact = store
        .add_artefact(NewArtefact { name, slug, kind, owning_app, state: ArtefactState::Draft })
        .await?;
      info!(id = %artefact.id, "artefact added");
      print_json(&artefact)
    }
    ArtefactCommand::Show { id } => {
      let artefact = store
        .get_artefact(id)
        .await?
        .with_context(|| format!("no artefact {id}"))?;
      print_json(&artefact)
    }
  }
}

async fn edition(store: &SqliteStore, cmd: EditionCommand) -> anyhow::Result<()> {
  match cmd {
    EditionCommand::Create { file } => {
      let input: EditionInput = read_json(&file)?;
      let edition = store.create_edition(input.into_edition(Utc::now())).await?;
      info!(id = %edition.id, kind = %edition.kind(), "edition created");
      print_json(&edition)
    }
    EditionCommand::Show { id } => print_json(&find_edition(store, id).await?),
    EditionCommand::Clone { id, kind } => {
      let source = find_edition(store, id).await?;
      let clone = store
        .create_edition(source.build_clone(kind, Utc::now())?)
        .await?;
      info!(
        from = %source.id,
        id = %clone.id,
        version = clone.version_number,
        "edition cloned"
      );
      print_json(&clone)
    }
    EditionCommand::Validate { file } => {
      let input: EditionInput = read_json(&file)?;
      let now = Utc::now();
      let edition = input.into_edition(now);
      let errors = validate_edition(store, &edition, &ValidationContext::create(now)).await?;
      if !errors.is_empty() {
        print_json(&errors)?;
        bail!("edition is invalid: {errors}");
      }
      info!("edition is valid");
      Ok(())
    }
    EditionCommand::Update { id, patch } => {
      let update: EditionUpdate = read_json(&patch)?;
      let edition = store.update_edition_attributes(id, update).await?;
      info!(id = %edition.id, "edition updated");
      print_json(&edition)
    }
  }
}

async fn downtime(store: &SqliteStore, cmd: DowntimeCommand) -> anyhow::Result<()> {
  match cmd {
    DowntimeCommand::Set { artefact, start, end, message } => {
      let downtime = match store.downtime_for(artefact).await? {
        Some(mut existing) => {
          existing.start_time = Some(start);
          existing.end_time = Some(end);
          existing.message = message;
          existing
        }
        None => Downtime { message, ..Downtime::new(artefact, start, end, Utc::now()) },
      };
      let saved = store.save_downtime(downtime).await?;
      info!(artefact = %artefact, publicise = saved.publicise(), "downtime saved");
      print_json(&saved)
    }
    DowntimeCommand::Show { artefact } => {
      let downtime = store
        .downtime_for(artefact)
        .await?
        .with_context(|| format!("no downtime for artefact {artefact}"))?;
      info!(publicise = downtime.publicise(), "downtime found");
      print_json(&downtime)
    }
    DowntimeCommand::Clear { artefact } => {
      if store.delete_downtime(artefact).await? {
        info!(artefact = %artefact, "downtime cleared");
      } else {
        info!(artefact = %artefact, "no downtime to clear");
      }
      Ok(())
    }
  }
}

fn factcheck(settings: &Settings, cmd: FactcheckCommand) -> anyhow::Result<()> {
  let address = FactCheckAddress::new(&settings.service_locator())
    .context("failed to derive the fact-check environment")?;
  match cmd {
    FactcheckCommand::Address { edition } => println!("{}", address.for_edition(edition)),
    FactcheckCommand::Parse { address: inbound } => {
      let id = address
        .edition_id(&inbound)
        .with_context(|| format!("{inbound:?} is not a fact-check address"))?;
      println!("{id}");
    }
  }
  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn find_edition(store: &SqliteStore, id: Uuid) -> anyhow::Result<Edition> {
  store
    .get_edition(id)
    .await?
    .with_context(|| format!("no edition {id}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
