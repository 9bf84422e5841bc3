mod run;
mod sink;

use anyhow::Context as _;
use arbi_core::{
    Category, ExchangeRate, PricingEngine, StoreConfig, StoreKind, Verdict, AUD_LABEL,
};
use arbi_scraper::{BankRateSource, PageClient};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "arbi")]
#[command(about = "Finds resellable listings on overseas sale pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Traverse the configured sale sections and export profitable listings
    Run {
        /// Only traverse sections of this store
        #[arg(long)]
        store: Option<StoreKind>,

        /// Only traverse the section with this name or brand
        #[arg(long)]
        section: Option<String>,

        /// Price listings without downloading images or writing files
        #[arg(long)]
        dry_run: bool,

        /// Print run summaries as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the current spot selling exchange rate
    Rate {
        /// Row label in the bank's rate table
        #[arg(long, default_value = AUD_LABEL)]
        currency: String,
    },
    /// Print the sale page URL of a brand
    Url {
        store: StoreKind,
        brand: String,

        #[arg(long)]
        category: Option<Category>,
    },
    /// Price a single listing with a store's policy
    Quote {
        /// Sale price as shown on the store, e.g. "$189.00"
        #[arg(long)]
        sale: String,

        /// Original price; omit for undiscounted listings
        #[arg(long)]
        original: Option<String>,

        #[arg(long, default_value_t = StoreKind::Cettire)]
        store: StoreKind,

        /// Exchange rate to use instead of fetching the current one
        #[arg(long)]
        rate: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = arbi_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Run {
            store,
            section,
            dry_run,
            json,
        } => {
            let options = run::RunOptions {
                store,
                section,
                dry_run,
                json,
            };
            run::run_command(&config, &options).await
        }
        Commands::Rate { currency } => {
            let rate = rate_source(&config)?.get_exchange_rate(&currency).await?;
            println!("{currency}: {rate}");
            Ok(())
        }
        Commands::Url {
            store,
            brand,
            category,
        } => {
            println!("{}", arbi_scraper::sale_url(store, &brand, category)?);
            Ok(())
        }
        Commands::Quote {
            sale,
            original,
            store,
            rate,
        } => quote(&config, &sale, original.as_deref(), store, rate).await,
    }
}

fn rate_source(config: &arbi_core::AppConfig) -> anyhow::Result<BankRateSource> {
    let client = PageClient::new(config.request_timeout_secs, &config.user_agent)?;
    Ok(BankRateSource::new(
        client,
        config.exchange_rate_url.clone(),
        run::retry_policy(config),
    ))
}

async fn quote(
    config: &arbi_core::AppConfig,
    sale: &str,
    original: Option<&str>,
    store: StoreKind,
    rate: Option<Decimal>,
) -> anyhow::Result<()> {
    let stores = match arbi_core::load_stores(&config.stores_path) {
        Ok(stores) => Some(stores),
        Err(e) => {
            tracing::warn!(error = %e, "store catalogue unavailable, using built-in policy");
            None
        }
    };
    let store_config = stores.as_ref().and_then(|s| s.store(store));
    let policy = store_config.map_or_else(|| store.default_policy(), StoreConfig::policy);
    let currency = store_config
        .and_then(StoreConfig::currency_label)
        .or_else(|| store.default_currency());

    let rate = match (rate, currency) {
        (Some(value), _) => ExchangeRate::new(value)?,
        (None, Some(label)) => rate_source(config)?
            .get_exchange_rate(label)
            .await
            .context("cannot quote without an exchange rate")?,
        (None, None) => ExchangeRate::unit(),
    };

    let verdict = PricingEngine::new(policy).evaluate(sale, original, rate)?;
    match &verdict {
        Verdict::Accepted(q) => println!(
            "accepted: cost {} -> sell {} (profit {}, {:.2}%)",
            q.landed_cost, q.selling_price, q.profit, q.profit_margin
        ),
        Verdict::Rejected(reason) => println!("rejected: {reason}"),
    }
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
