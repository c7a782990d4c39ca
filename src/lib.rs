extern crate clap;

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod services;

use anyhow::{Context, Result};
use backend::memory::MemoryBackend;
use clap::{Arg, ArgAction, ArgMatches};
use config::{FileSettings, Fixtures, Overrides, Settings};
use services::{SeedOptions, SeedSummary, Seeder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Initializes tracing. `RUST_LOG` overrides the default `fixero_seed=info` filter.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "fixero_seed=info".to_string());

    if json {
        let _ = fmt().with_env_filter(EnvFilter::new(filter_directive)).json().try_init();
    } else {
        let _ = fmt().with_env_filter(EnvFilter::new(filter_directive)).try_init();
    }
}

pub fn cli() -> clap::Command {
    clap::Command::new("fixero-seed")
        .about("Wipe the Fixero Firebase project and load fixture data")
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("SETTINGS")
                .help("Path to a YAML settings file"),
        )
        .arg(
            Arg::new("fixtures")
                .short('f')
                .long("fixtures")
                .value_name("FIXTURES")
                .help("Path to a YAML fixture file (defaults to the built-in fixtures)"),
        )
        .arg(
            Arg::new("project")
                .short('p')
                .long("project")
                .value_name("PROJECT_ID")
                .help("Firebase project id"),
        )
        .arg(
            Arg::new("database_url")
                .long("database-url")
                .value_name("URL")
                .help("Realtime Database URL (defaults to https://<project>-default-rtdb.firebaseio.com)"),
        )
        .arg(
            Arg::new("credentials")
                .short('c')
                .long("credentials")
                .value_name("KEY_FILE")
                .help("Service account key file"),
        )
        .arg(
            Arg::new("access_token")
                .long("access-token")
                .value_name("TOKEN")
                .help("Use this OAuth2 access token instead of a service account"),
        )
        .arg(
            Arg::new("password_storage")
                .long("password-storage")
                .value_name("MODE")
                .value_parser(["hash", "plaintext", "omit"])
                .help("How manager passwords are written to the database"),
        )
        .arg(
            Arg::new("skip_reset")
                .long("skip-reset")
                .action(ArgAction::SetTrue)
                .help("Keep existing data and users; only write fixtures"),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Seed an in-memory backend and print the resulting database"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Confirm that all existing data and users may be deleted"),
        )
        .arg(
            Arg::new("summary_out")
                .long("summary-out")
                .value_name("PATH")
                .help("Write the run summary as JSON to this path"),
        )
        .arg(
            Arg::new("log_json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
}

fn path_arg(matches: &ArgMatches, name: &str) -> Option<PathBuf> {
    matches.get_one::<String>(name).map(PathBuf::from)
}

fn overrides_from(matches: &ArgMatches) -> Result<Overrides> {
    let password_storage = matches
        .get_one::<String>("password_storage")
        .map(|s| s.parse::<auth::PasswordStorage>())
        .transpose()?;

    Ok(Overrides {
        project_id: matches.get_one::<String>("project").cloned(),
        database_url: matches.get_one::<String>("database_url").cloned(),
        credentials: path_arg(matches, "credentials"),
        access_token: matches.get_one::<String>("access_token").cloned(),
        password_storage,
        fixtures: path_arg(matches, "fixtures"),
        confirm: matches.get_flag("yes"),
    })
}

fn write_summary(path: &Path, summary: &SeedSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    tracing::info!("Wrote summary to {}", path.display());
    Ok(())
}

/// Run against an in-memory backend; returns the summary and the resulting database tree.
pub async fn dry_run(
    fixtures: &Fixtures,
    options: SeedOptions,
) -> Result<(SeedSummary, serde_json::Value)> {
    let backend = Arc::new(MemoryBackend::new());
    let seeder = Seeder::new(backend.clone(), backend.clone(), options);
    let summary = seeder.run(fixtures).await?;
    Ok((summary, backend.export()))
}

/// Seed the configured Firebase project.
pub async fn seed_firebase(settings: &Settings, fixtures: &Fixtures, skip_reset: bool) -> Result<SeedSummary> {
    let (auth, database) = backend::firebase::connect(settings)?;
    tracing::info!(
        project = %settings.project_id,
        database = %settings.database_url,
        "Seeding Firebase project"
    );

    let seeder = Seeder::new(
        Arc::new(auth),
        Arc::new(database),
        SeedOptions {
            skip_reset,
            password_storage: settings.password_storage,
        },
    );
    Ok(seeder.run(fixtures).await?)
}

/// Entry point used by the binary.
pub async fn run_cli() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log_json"));

    let file = match path_arg(&matches, "settings") {
        Some(path) => FileSettings::load(&path)?,
        None => FileSettings::default(),
    };
    let overrides = overrides_from(&matches)?;
    let skip_reset = matches.get_flag("skip_reset");

    let summary = if matches.get_flag("dry_run") {
        let fixtures = Fixtures::load(overrides.fixtures.as_deref().or(file.fixtures.as_deref()))?;
        let options = SeedOptions {
            skip_reset,
            password_storage: overrides
                .password_storage
                .or(file.password_storage)
                .unwrap_or_default(),
        };
        let (summary, tree) = dry_run(&fixtures, options).await?;
        println!("{}", serde_json::to_string_pretty(&tree)?);
        summary
    } else {
        let settings = Settings::resolve(file, overrides, |key| std::env::var(key).ok())?;
        if !settings.confirm && !skip_reset {
            anyhow::bail!(
                "Refusing to wipe project '{}' without confirmation; pass --yes",
                settings.project_id
            );
        }
        let fixtures = Fixtures::load(settings.fixtures.as_deref())?;
        seed_firebase(&settings, &fixtures, skip_reset).await?
    };

    if let Some(path) = path_arg(&matches, "summary_out") {
        write_summary(&path, &summary)?;
    }
    Ok(())
}
