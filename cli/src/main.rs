use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use record_codec_core::{CodecError, DecodeError, DecodeOptions, SchemaRegistry};
use record_codec_db::{CodecConfig, DocumentStore, QueryFilter};
use record_codec_sqlite::{Migration, SeedReport, SqliteStore};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "record-codec")]
#[command(about = "Decode, normalize and store records against registered schemas")]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered type names.
    Types,
    /// Decode JSON files as a registered type and print their normalized form.
    Decode(DecodeArgs),
    /// Read and write documents in a SQLite store.
    Store(StoreArgs),
    /// SQLite table migration and seeding operations.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// Registered type name (see `types`).
    #[arg(long = "type")]
    type_name: String,
    /// JSON files to decode.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Override the recursive nesting limit from the configuration.
    #[arg(long)]
    max_depth: Option<usize>,
}

/// Database location shared by `store` and `migrate`.
#[derive(Debug, Args)]
struct DbArgs {
    /// Database file path; defaults to `sqlite.path` from the configuration.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Table prefix; defaults to `sqlite.table_prefix` from the configuration.
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Debug, Args)]
struct StoreArgs {
    #[command(flatten)]
    db: DbArgs,
    #[command(subcommand)]
    operation: StoreOperation,
}

#[derive(Debug, Subcommand)]
enum StoreOperation {
    /// Validate a JSON file as a type and store its normalized form.
    Put(StorePutArgs),
    /// Print a stored document.
    Get(StoreGetArgs),
    /// Remove a stored document.
    Delete(StoreKeyArgs),
    /// List documents in a collection.
    Query(StoreQueryArgs),
}

#[derive(Debug, Args)]
struct StoreKeyArgs {
    /// Collection name.
    collection: String,
    /// Document id within the collection.
    id: String,
}

#[derive(Debug, Args)]
struct StorePutArgs {
    #[command(flatten)]
    key: StoreKeyArgs,
    /// JSON file holding the document.
    file: PathBuf,
    /// Registered type the document must decode as.
    #[arg(long = "type")]
    type_name: String,
}

#[derive(Debug, Args)]
struct StoreGetArgs {
    #[command(flatten)]
    key: StoreKeyArgs,
    /// Decode the stored document as this type and print its normalized form.
    #[arg(long = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Args)]
struct StoreQueryArgs {
    /// Collection name.
    collection: String,
    /// Id prefix within the collection.
    #[arg(long)]
    id_prefix: Option<String>,
    /// Top-level field constraint `FIELD=VALUE`; VALUE is parsed as JSON when possible.
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    conditions: Vec<String>,
    /// Decode every match as this type and print normalized forms.
    #[arg(long = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(flatten)]
    db: DbArgs,
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the documents table.
    Up,
    /// Drop the documents table.
    Down,
    /// Show table status and per-collection counts.
    Status,
    /// Seed the table with JSON fixtures from a directory.
    Seed(MigrateSourceArgs),
    /// Drop the table, recreate it, and reseed from a directory.
    Refresh(MigrateSourceArgs),
}

#[derive(Debug, Args)]
struct MigrateSourceArgs {
    /// Directory of JSON fixture files; keys are relative paths without `.json`.
    #[arg(long)]
    source: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Types => run_types(),
        Command::Decode(args) => run_decode(args, &config),
        Command::Store(args) => run_store(args, &config),
        Command::Migrate(args) => run_migrate(args, &config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig, String> {
    match path {
        Some(path) => CodecConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(CodecConfig::default()),
    }
}

fn schema_registry() -> Result<&'static SchemaRegistry, String> {
    record_codec_models::registry().map_err(|e| format!("Failed to build schema registry: {e}"))
}

// ---------------------------------------------------------------------------
// types / decode commands
// ---------------------------------------------------------------------------

fn run_types() -> Result<(), String> {
    for name in schema_registry()?.type_names() {
        println!("{name}");
    }
    Ok(())
}

fn run_decode(args: DecodeArgs, config: &CodecConfig) -> Result<(), String> {
    let registry = schema_registry()?;
    if !registry.contains(&args.type_name) {
        return Err(CodecError::UnknownType(args.type_name).to_string());
    }
    let options = match args.max_depth {
        Some(limit) => DecodeOptions::default().with_max_depth(limit),
        None => config.decode_options(),
    };

    let mut failed = 0usize;
    for path in &args.files {
        let raw = read_json(path)?;
        match registry.normalize_with(&args.type_name, &raw, &options) {
            Ok(normalized) => println!("{}", to_pretty(&normalized)?),
            Err(err) => {
                failed += 1;
                report_codec_error(&path.display().to_string(), &err);
            }
        }
    }

    if failed > 0 {
        return Err(format!(
            "{failed} of {} file(s) failed to decode as {}",
            args.files.len(),
            args.type_name
        ));
    }
    Ok(())
}

/// Prints one line per validation issue, or the error itself for fatal failures.
fn report_codec_error(source: &str, err: &CodecError) {
    match err {
        CodecError::Decode(DecodeError::Invalid(invalid)) => {
            for issue in invalid.issues() {
                eprintln!("{source}: {issue}");
            }
        }
        other => eprintln!("{source}: {other}"),
    }
}

// ---------------------------------------------------------------------------
// store command
// ---------------------------------------------------------------------------

fn run_store(args: StoreArgs, config: &CodecConfig) -> Result<(), String> {
    let (db, prefix) = resolve_db(&args.db, config);
    let conn = rusqlite::Connection::open(&db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    let store = SqliteStore::new(conn, &prefix)
        .map_err(|e| format!("Failed to initialize store: {e}"))?;

    match args.operation {
        StoreOperation::Put(a) => run_store_put(&store, a, config),
        StoreOperation::Get(a) => run_store_get(&store, a, config),
        StoreOperation::Delete(a) => run_store_delete(&store, a, config),
        StoreOperation::Query(a) => run_store_query(&store, a, config),
    }
}

fn run_store_put(store: &SqliteStore, args: StorePutArgs, config: &CodecConfig) -> Result<(), String> {
    let raw = read_json(&args.file)?;
    let key = document_key(config, &args.key);
    let source = args.file.display().to_string();
    let normalized = normalize_incoming(&key, &source, &raw, &args.type_name, config)?;
    store
        .put(&key, &normalized)
        .map_err(|e| format!("Failed to store '{key}': {e}"))?;
    println!("Stored {} as '{key}'.", args.type_name);
    Ok(())
}

fn run_store_get(store: &SqliteStore, args: StoreGetArgs, config: &CodecConfig) -> Result<(), String> {
    let key = document_key(config, &args.key);
    let body = store
        .get(&key)
        .map_err(|e| format!("Failed to read '{key}': {e}"))?
        .ok_or_else(|| format!("No document at '{key}'"))?;
    let body = match &args.type_name {
        Some(type_name) => normalize_stored(&key, &body, type_name, config)?,
        None => body,
    };
    println!("{}", to_pretty(&body)?);
    Ok(())
}

fn run_store_delete(
    store: &SqliteStore,
    args: StoreKeyArgs,
    config: &CodecConfig,
) -> Result<(), String> {
    let key = document_key(config, &args);
    let removed = store
        .delete(&key)
        .map_err(|e| format!("Failed to delete '{key}': {e}"))?;
    if removed {
        println!("Deleted '{key}'.");
    } else {
        println!("No document at '{key}'.");
    }
    Ok(())
}

fn run_store_query(
    store: &SqliteStore,
    args: StoreQueryArgs,
    config: &CodecConfig,
) -> Result<(), String> {
    let collection = config.collection(&args.collection);
    let mut filter = QueryFilter::all();
    if let Some(prefix) = &args.id_prefix {
        filter = filter.with_prefix(prefix.clone());
    }
    for condition in &args.conditions {
        let (field, value) = parse_condition(condition)?;
        filter = filter.where_eq(field, value);
    }
    let filter = filter.within(&collection);

    let documents = store
        .query(&filter)
        .map_err(|e| format!("Query on '{collection}' failed: {e}"))?;
    let root = collection.len() + 1;
    let mut rows = Vec::with_capacity(documents.len());
    for document in documents {
        let body = match &args.type_name {
            Some(type_name) => normalize_stored(&document.key, &document.body, type_name, config)?,
            None => document.body,
        };
        rows.push(serde_json::json!({"id": &document.key[root..], "body": body}));
    }
    println!("{}", to_pretty(&Value::Array(rows))?);
    Ok(())
}

fn normalize_stored(
    key: &str,
    body: &Value,
    type_name: &str,
    config: &CodecConfig,
) -> Result<Value, String> {
    schema_registry()?
        .normalize_with(type_name, body, &config.decode_options())
        .map_err(|err| {
            tracing::error!(key, payload = %body, error = %err, "stored document failed to decode");
            report_codec_error(key, &err);
            format!("Document '{key}' is not a valid {type_name}")
        })
}

/// Normalizes a document read from `source` before it is written to `key`.
fn normalize_incoming(
    key: &str,
    source: &str,
    raw: &Value,
    type_name: &str,
    config: &CodecConfig,
) -> Result<Value, String> {
    schema_registry()?
        .normalize_with(type_name, raw, &config.decode_options())
        .map_err(|err| {
            tracing::error!(key, payload = %raw, error = %err, "document failed to normalize");
            report_codec_error(source, &err);
            format!("'{source}' is not a valid {type_name}")
        })
}

fn document_key(config: &CodecConfig, args: &StoreKeyArgs) -> String {
    format!("{}/{}", config.collection(&args.collection), args.id)
}

/// Splits `FIELD=VALUE`; VALUE falls back to a plain string when it is not JSON.
fn parse_condition(condition: &str) -> Result<(String, Value), String> {
    let (field, value) = condition
        .split_once('=')
        .ok_or_else(|| format!("Invalid --where '{condition}': expected FIELD=VALUE"))?;
    if field.is_empty() {
        return Err(format!("Invalid --where '{condition}': empty field name"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs, config: &CodecConfig) -> Result<(), String> {
    let (db, prefix) = resolve_db(&args.db, config);
    let conn = rusqlite::Connection::open(&db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    let mut migration =
        Migration::new(conn, &prefix).map_err(|e| format!("Failed to initialize migration: {e}"))?;

    match args.operation {
        MigrateOperation::Up => {
            migration
                .up()
                .map_err(|e| format!("Migration up failed: {e}"))?;
            println!(
                "Migration up complete. Tables created with prefix '{prefix}' in '{}'.",
                db.display()
            );
        }
        MigrateOperation::Down => {
            migration
                .down()
                .map_err(|e| format!("Migration down failed: {e}"))?;
            println!(
                "Migration down complete. Tables with prefix '{prefix}' dropped from '{}'.",
                db.display()
            );
        }
        MigrateOperation::Status => {
            let status = migration
                .status_under(&config.store.collection_prefix)
                .map_err(|e| format!("Failed to get migration status: {e}"))?;
            println!("Migration Status:");
            println!(
                "  Tables exist: {}",
                if status.tables_exist { "yes" } else { "no" }
            );
            println!("  Document count: {}", status.document_count);
            for (collection, count) in &status.collections {
                let name = if collection.is_empty() { "(root)" } else { collection };
                println!("  {name}: {count}");
            }
        }
        MigrateOperation::Seed(a) => {
            let report = migration
                .seed(&a.source)
                .map_err(|e| format!("Seed failed: {e}"))?;
            print_seed_report("Seed complete:", report);
        }
        MigrateOperation::Refresh(a) => {
            let report = migration
                .refresh(&a.source)
                .map_err(|e| format!("Refresh failed: {e}"))?;
            print_seed_report("Refresh complete (table dropped, recreated, and reseeded):", report);
        }
    }
    Ok(())
}

fn print_seed_report(heading: &str, report: SeedReport) {
    println!("{heading}");
    println!("  Documents inserted: {}", report.inserted);
    println!("  Documents replaced: {}", report.replaced);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_db(args: &DbArgs, config: &CodecConfig) -> (PathBuf, String) {
    let db = args.db.clone().unwrap_or_else(|| config.sqlite.path.clone());
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| config.sqlite.table_prefix.clone());
    (db, prefix)
}

fn read_json(path: &Path) -> Result<Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("Failed to parse '{}': {e}", path.display()))
}

fn to_pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_condition_prefers_json() {
        assert_eq!(
            parse_condition("active=true").unwrap(),
            ("active".to_string(), Value::Bool(true))
        );
        assert_eq!(
            parse_condition("platform=iOS").unwrap(),
            ("platform".to_string(), Value::String("iOS".into()))
        );
        assert_eq!(
            parse_condition("note=a=b").unwrap(),
            ("note".to_string(), Value::String("a=b".into()))
        );
    }

    #[test]
    fn test_parse_condition_rejects_malformed() {
        assert!(parse_condition("active").is_err());
        assert!(parse_condition("=1").is_err());
    }

    #[test]
    fn test_normalize_incoming_rejects_invalid_document() {
        let config = CodecConfig::default();
        let raw = serde_json::json!({"platform": "iOS"});
        let err = normalize_incoming("devices/d1", "bad.json", &raw, "UserDevice", &config)
            .unwrap_err();
        assert_eq!(err, "'bad.json' is not a valid UserDevice");

        let good = serde_json::json!({"notificationToken": "tok1", "platform": "iOS", "extra": 1});
        let normalized =
            normalize_incoming("devices/d1", "good.json", &good, "UserDevice", &config).unwrap();
        assert_eq!(normalized, serde_json::json!({"notificationToken": "tok1", "platform": "iOS"}));
    }

    #[test]
    fn test_document_key_uses_collection_prefix() {
        let mut config = CodecConfig::default();
        let args = StoreKeyArgs {
            collection: "patients".into(),
            id: "p1".into(),
        };
        assert_eq!(document_key(&config, &args), "patients/p1");
        config.store.collection_prefix = "tenant".into();
        assert_eq!(document_key(&config, &args), "tenant/patients/p1");
    }

    #[test]
    fn test_cli_parses_store_query() {
        let cli = Cli::try_parse_from([
            "record-codec",
            "store",
            "--db",
            "x.db",
            "query",
            "patients",
            "--where",
            "active=true",
            "--type",
            "Patient",
        ])
        .unwrap();
        match cli.command {
            Command::Store(StoreArgs {
                operation: StoreOperation::Query(query),
                ..
            }) => {
                assert_eq!(query.collection, "patients");
                assert_eq!(query.conditions, vec!["active=true"]);
                assert_eq!(query.type_name.as_deref(), Some("Patient"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
