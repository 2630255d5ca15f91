use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::PasswordService;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::aggregates::{self, Aggregate};
use crate::database::{Collection, Document, PgStore, Store};
use crate::filter::FilterSpec;

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Load bootcamps, courses, users and reviews from JSON files")]
    Import {
        #[arg(long, default_value = "_data", help = "Directory holding the seed JSON files")]
        dir: PathBuf,
    },

    #[command(about = "Delete every document in every collection")]
    Destroy,
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    if config.database.url.is_none() {
        return Err(anyhow!(
            "seeding needs DATABASE_URL; the in-memory store does not outlive this command"
        ));
    }
    let store = PgStore::connect(&config.database).await.context("failed to connect to the database")?;

    match cmd {
        SeedCommands::Import { dir } => {
            let data = SeedData::load(&dir)?;
            let report = import(&store, &PasswordService::new(), data).await?;
            output_success(output_format, "Data imported", Some(report.to_json()))
        }
        SeedCommands::Destroy => {
            let removed = destroy(&store).await?;
            output_success(output_format, "Data destroyed", Some(json!({ "deleted": removed })))
        }
    }
}

/// Raw seed documents, one list per collection.
#[derive(Debug, Default)]
pub struct SeedData {
    pub users: Vec<Document>,
    pub bootcamps: Vec<Document>,
    pub courses: Vec<Document>,
    pub reviews: Vec<Document>,
}

impl SeedData {
    /// Reads `bootcamps.json`, `courses.json`, `users.json` and, when present, `reviews.json`.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            users: read_documents(&dir.join("users.json"))?,
            bootcamps: read_documents(&dir.join("bootcamps.json"))?,
            courses: read_documents(&dir.join("courses.json"))?,
            reviews: match dir.join("reviews.json") {
                path if path.exists() => read_documents(&path)?,
                _ => Vec::new(),
            },
        })
    }
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let values: Vec<Value> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array", path.display()))?;
    values
        .into_iter()
        .map(|value| match value {
            Value::Object(doc) => Ok(doc),
            other => Err(anyhow!("{}: expected an object, found {}", path.display(), other)),
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

impl SeedReport {
    pub fn to_json(&self) -> Value {
        json!({
            "users": self.users,
            "bootcamps": self.bootcamps,
            "courses": self.courses,
            "reviews": self.reviews,
        })
    }
}

/// Seed files carry their own ids, which need not be UUIDs. Each one is kept when it already is
/// a UUID and replaced otherwise, and references between files follow the replacement.
#[derive(Debug, Default)]
struct IdMap(HashMap<String, String>);

impl IdMap {
    fn assign(&mut self, doc: &mut Document) {
        let original = doc
            .remove("_id")
            .or_else(|| doc.remove("id"))
            .and_then(|v| v.as_str().map(str::to_string));
        let id = match original.as_deref().map(Uuid::parse_str) {
            Some(Ok(id)) => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if let Some(original) = original {
            self.0.insert(original, id.clone());
        }
        doc.insert("id".into(), Value::String(id));
    }

    fn relink(&self, doc: &mut Document, field: &str) {
        let Some(reference) = doc.get(field).and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        match self.0.get(&reference) {
            Some(id) => {
                doc.insert(field.to_string(), Value::String(id.clone()));
            }
            None if Uuid::parse_str(&reference).is_ok() => {}
            None => {
                debug!("Dropping dangling {} reference {}", field, reference);
                doc.remove(field);
            }
        }
    }
}

/// Drops keys the collection does not store, such as `__v`.
fn known_fields(collection: Collection, mut doc: Document) -> Document {
    doc.retain(|key, _| collection.column(key).is_some());
    doc
}

fn parent_bootcamp(doc: &Document) -> Option<Uuid> {
    doc.get("bootcamp").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

/// Inserts the seed data: users first (passwords hashed), then bootcamps, courses and reviews,
/// then recomputes every bootcamp average.
pub async fn import(store: &dyn Store, passwords: &PasswordService, data: SeedData) -> anyhow::Result<SeedReport> {
    let mut ids = IdMap::default();
    let mut report = SeedReport::default();

    for mut user in data.users {
        ids.assign(&mut user);
        if let Some(plain) = user.get("password").and_then(Value::as_str).map(str::to_string) {
            let hash = passwords.hash(&plain)?;
            user.insert("password".into(), Value::String(hash));
        }
        store.create(Collection::Users, known_fields(Collection::Users, user)).await?;
        report.users += 1;
    }

    for mut bootcamp in data.bootcamps {
        ids.assign(&mut bootcamp);
        ids.relink(&mut bootcamp, "user");
        store.create(Collection::Bootcamps, known_fields(Collection::Bootcamps, bootcamp)).await?;
        report.bootcamps += 1;
    }

    let mut touched: HashMap<Uuid, Vec<Aggregate>> = HashMap::new();
    for (collection, docs) in [(Collection::Courses, data.courses), (Collection::Reviews, data.reviews)] {
        for mut doc in docs {
            ids.assign(&mut doc);
            ids.relink(&mut doc, "bootcamp");
            ids.relink(&mut doc, "user");
            let aggregate = Aggregate::for_collection(collection);
            if let (Some(bootcamp), Some(aggregate)) = (parent_bootcamp(&doc), aggregate) {
                let pending = touched.entry(bootcamp).or_default();
                if !pending.contains(&aggregate) {
                    pending.push(aggregate);
                }
            }
            store.create(collection, known_fields(collection, doc)).await?;
            match collection {
                Collection::Courses => report.courses += 1,
                _ => report.reviews += 1,
            }
        }
    }

    for (bootcamp, pending) in touched {
        for aggregate in pending {
            aggregates::refresh(store, aggregate, bootcamp).await;
        }
    }

    info!(
        "Imported {} users, {} bootcamps, {} courses, {} reviews",
        report.users, report.bootcamps, report.courses, report.reviews
    );
    Ok(report)
}

/// Empties every collection, children before parents. Returns the number of documents removed.
pub async fn destroy(store: &dyn Store) -> anyhow::Result<u64> {
    let everything = FilterSpec::new();
    let mut removed = 0;
    for collection in [Collection::Reviews, Collection::Courses, Collection::Bootcamps, Collection::Users] {
        let n = store.delete_many(collection, &everything).await?;
        info!("Deleted {} documents from {}", n, collection);
        removed += n;
    }
    Ok(removed)
}
