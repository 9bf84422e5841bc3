pub mod app_config;
pub mod config;
pub mod currency;
pub mod error;
pub mod listing;
pub mod pricing;
pub mod stores;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use currency::{convert, ExchangeRate};
pub use error::{ConfigError, PricingError};
pub use listing::{normalize_title, ListingRecord, RawItem};
pub use pricing::{
    parse_price, profitable_price, PriceQuote, PRICE_STEP, PricingEngine, PricingPolicy, Rejection, Verdict,
};
pub use stores::{
    load_stores, parse_stores, Category, PricingOverrides, SectionConfig, StoreConfig, StoreKind,
    StoresFile, AUD_LABEL,
};
