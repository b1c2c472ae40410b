//! # Shop Tax Settings Seeder
//!
//! Writes active/fallback tax-service selections into the tax package's
//! per-shop settings for development.
//!
//! ## Usage
//! ```bash
//! # One shop with an active service
//! cargo run -p taxes-db --bin seed -- --shop shop-1 --active custom-rates
//!
//! # Several shops, the second with a fallback
//! cargo run -p taxes-db --bin seed -- \
//!     --shop shop-1 --active custom-rates \
//!     --shop shop-2 --active avalara --fallback custom-rates
//!
//! # Specify database path (overrides config and TAXES_DB_PATH)
//! cargo run -p taxes-db --bin seed -- --db ./data/taxes.db --shop shop-1 --active flat-rate
//! ```
//!
//! `--active` and `--fallback` apply to the most recent `--shop`.

use std::env;
use std::path::PathBuf;
use taxes_core::ShopTaxConfigStore;
use taxes_db::{Database, TaxesConfig, DEFAULT_LOG_FILTER};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// One shop's requested selections.
#[derive(Debug, Default)]
struct ShopSeed {
    shop_id: String,
    active: Option<String>,
    fallback: Option<String>,
}

#[derive(Debug, Default)]
struct SeedArgs {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    shops: Vec<ShopSeed>,
}

enum Command {
    Seed(SeedArgs),
    Help,
}

fn print_help() {
    println!("Shop Tax Settings Seeder");
    println!();
    println!("Usage: seed [OPTIONS] --shop <ID> [--active <NAME>] [--fallback <NAME>] ...");
    println!();
    println!("Options:");
    println!("  -s, --shop <ID>          Start settings for a shop");
    println!("  -a, --active <NAME>      Active tax service for the current shop");
    println!("  -f, --fallback <NAME>    Fallback tax service for the current shop");
    println!("  -c, --config <PATH>      Config file (default: platform config dir)");
    println!("  -d, --db <PATH>          Database file path (overrides config)");
    println!("  -h, --help               Show this help message");
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut parsed = SeedArgs::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };

        match arg.as_str() {
            "--shop" | "-s" => parsed.shops.push(ShopSeed {
                shop_id: value(arg)?,
                ..ShopSeed::default()
            }),
            "--active" | "-a" | "--fallback" | "-f" => {
                let name = value(arg)?;
                let shop = parsed
                    .shops
                    .last_mut()
                    .ok_or_else(|| format!("{arg} must follow --shop"))?;
                if matches!(arg.as_str(), "--active" | "-a") {
                    shop.active = Some(name);
                } else {
                    shop.fallback = Some(name);
                }
            }
            "--config" | "-c" => parsed.config_path = Some(PathBuf::from(value(arg)?)),
            "--db" | "-d" => parsed.db_path = Some(PathBuf::from(value(arg)?)),
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    if parsed.shops.is_empty() {
        return Err("at least one --shop is required".to_string());
    }

    Ok(Command::Seed(parsed))
}

/// `TAXES_LOG` is already folded into `config.logging.filter` by
/// [`TaxesConfig::load`].
fn log_filter(config: &TaxesConfig) -> EnvFilter {
    EnvFilter::new(&config.logging.filter)
}

fn init_tracing(config: &TaxesConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config))
        .init();
}

/// Loads the config with a temporary subscriber so its own log lines are kept.
fn load_config(path: Option<PathBuf>) -> Result<TaxesConfig, taxes_db::DbError> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
        .finish();

    tracing::subscriber::with_default(bootstrap, || TaxesConfig::load(path))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let seed = match parse_args(&args) {
        Ok(Command::Seed(seed)) => seed,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!();
            print_help();
            std::process::exit(2);
        }
    };

    let mut config = load_config(seed.config_path.clone())?;
    if let Some(path) = seed.db_path.clone() {
        config.database.path = path;
    }

    init_tracing(&config);

    info!(
        path = %config.database.path.display(),
        package = %config.package_name(),
        shops = seed.shops.len(),
        "Seeding shop tax settings"
    );

    let db = Database::new(config.db_config()).await?;
    let packages = db.packages();
    let store = db.shop_tax_config_store(config.package_name());

    for shop in &seed.shops {
        if let Err(e) = packages
            .set_tax_services(
                config.package_name(),
                &shop.shop_id,
                shop.active.as_deref(),
                shop.fallback.as_deref(),
            )
            .await
        {
            error!(shop_id = %shop.shop_id, error = %e, "Failed to write tax settings");
            continue;
        }

        let saved = store.find_shop_tax_config(&shop.shop_id).await?;
        let active = saved.as_ref().and_then(|c| c.active_name()).unwrap_or("-");
        let fallback = saved.as_ref().and_then(|c| c.fallback_name()).unwrap_or("-");
        println!("✓ {}: active={} fallback={}", shop.shop_id, active, fallback);
    }

    println!();
    println!("✓ {} package settings rows", packages.count().await?);

    db.close().await;
    Ok(())
}
