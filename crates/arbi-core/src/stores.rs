use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingPolicy;
use crate::ConfigError;

/// Bank rate-table label for the Australian dollar.
pub const AUD_LABEL: &str = "Australian Dollar (AUD)";

/// The retailers this tool knows how to traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Upthere,
    Supply,
    Cettire,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Upthere, StoreKind::Supply, StoreKind::Cettire];

    /// Every catalog URL of this store starts with this prefix.
    #[must_use]
    pub fn url_prefix(self) -> &'static str {
        match self {
            StoreKind::Upthere => "https://uptherestore.com",
            StoreKind::Supply => "https://www.supplystore.com.au",
            StoreKind::Cettire => "https://www.cettire.com/tw",
        }
    }

    /// Rate-table label of the listing currency, or `None` when the store
    /// already prices in local currency.
    #[must_use]
    pub fn default_currency(self) -> Option<&'static str> {
        match self {
            StoreKind::Upthere | StoreKind::Supply => Some(AUD_LABEL),
            StoreKind::Cettire => None,
        }
    }

    /// Whether sections may name a brand instead of a full URL.
    #[must_use]
    pub fn has_brand_sale_pages(self) -> bool {
        matches!(self, StoreKind::Upthere | StoreKind::Cettire)
    }

    #[must_use]
    pub fn default_policy(self) -> PricingPolicy {
        match self {
            // Prices include 10% GST, refunded on export.
            StoreKind::Upthere => PricingPolicy {
                source_tax_rate: Decimal::new(1, 1),
                profit_rate: Decimal::new(63, 3),
                min_profit_floor: Decimal::from(300),
                ..PricingPolicy::default()
            },
            StoreKind::Supply => PricingPolicy {
                profit_rate: Decimal::new(11, 2),
                use_max_profit: true,
                min_profit_floor: Decimal::from(300),
                ..PricingPolicy::default()
            },
            StoreKind::Cettire => PricingPolicy {
                currency_margin: Decimal::ONE,
                shipping_fee: Decimal::from(700),
                free_shipping_threshold: Some(Decimal::from(7000)),
                duty_rate: Decimal::ONE,
                ..PricingPolicy::default()
            },
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Upthere => write!(f, "upthere"),
            StoreKind::Supply => write!(f, "supply"),
            StoreKind::Cettire => write!(f, "cettire"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upthere" => Ok(StoreKind::Upthere),
            "supply" => Ok(StoreKind::Supply),
            "cettire" => Ok(StoreKind::Cettire),
            other => Err(ConfigError::Validation(format!(
                "unknown store '{other}'; expected upthere, supply or cettire"
            ))),
        }
    }
}

/// Product category filter on a brand's sale page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Bags,
    Accessories,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Bags => write!(f, "Bags"),
            Category::Accessories => write!(f, "Accessories"),
        }
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bags" => Ok(Category::Bags),
            "accessories" => Ok(Category::Accessories),
            other => Err(ConfigError::Validation(format!(
                "unknown category '{other}'; expected Bags or Accessories"
            ))),
        }
    }
}

/// One catalog to traverse: a brand's sale page, or an explicit URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub brand: Option<String>,
    pub url: Option<String>,
    pub category: Option<Category>,
}

/// Optional per-store replacements for [`StoreKind::default_policy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingOverrides {
    pub currency_margin: Option<Decimal>,
    pub shipping_fee: Option<Decimal>,
    pub free_shipping_threshold: Option<Decimal>,
    pub duty_rate: Option<Decimal>,
    pub source_tax_rate: Option<Decimal>,
    pub profit_rate: Option<Decimal>,
    pub base_increment: Option<Decimal>,
    pub use_max_profit: Option<bool>,
    pub min_profit_floor: Option<Decimal>,
}

impl PricingOverrides {
    #[must_use]
    pub fn apply(&self, base: PricingPolicy) -> PricingPolicy {
        PricingPolicy {
            currency_margin: self.currency_margin.unwrap_or(base.currency_margin),
            shipping_fee: self.shipping_fee.unwrap_or(base.shipping_fee),
            free_shipping_threshold: self
                .free_shipping_threshold
                .or(base.free_shipping_threshold),
            duty_rate: self.duty_rate.unwrap_or(base.duty_rate),
            source_tax_rate: self.source_tax_rate.unwrap_or(base.source_tax_rate),
            profit_rate: self.profit_rate.unwrap_or(base.profit_rate),
            base_increment: self.base_increment.unwrap_or(base.base_increment),
            use_max_profit: self.use_max_profit.unwrap_or(base.use_max_profit),
            min_profit_floor: self.min_profit_floor.unwrap_or(base.min_profit_floor),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Overrides [`StoreKind::default_currency`].
    pub currency: Option<String>,
    #[serde(default)]
    pub pricing: PricingOverrides,
    pub sections: Vec<SectionConfig>,
}

impl StoreConfig {
    /// Effective pricing policy: store defaults with YAML overrides applied.
    #[must_use]
    pub fn policy(&self) -> PricingPolicy {
        self.pricing.apply(self.kind.default_policy())
    }

    #[must_use]
    pub fn currency_label(&self) -> Option<&str> {
        self.currency
            .as_deref()
            .or_else(|| self.kind.default_currency())
    }
}

#[derive(Debug, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<StoreConfig>,
}

impl StoresFile {
    #[must_use]
    pub fn store(&self, kind: StoreKind) -> Option<&StoreConfig> {
        self.stores.iter().find(|s| s.kind == kind)
    }
}

/// Load and validate the store catalogue from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_stores(path: &Path) -> Result<StoresFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_stores(&content)
}

/// Parse and validate store catalogue YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_stores(content: &str) -> Result<StoresFile, ConfigError> {
    let stores_file: StoresFile = serde_yaml::from_str(content)?;
    validate_stores(&stores_file)?;
    Ok(stores_file)
}

fn validate_stores(stores_file: &StoresFile) -> Result<(), ConfigError> {
    if stores_file.stores.is_empty() {
        return Err(ConfigError::Validation(
            "at least one store must be configured".to_string(),
        ));
    }

    let mut seen_kinds = HashSet::new();
    for store in &stores_file.stores {
        if !seen_kinds.insert(store.kind) {
            return Err(ConfigError::Validation(format!(
                "store '{}' is configured more than once",
                store.kind
            )));
        }

        if store.sections.is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has no sections",
                store.kind
            )));
        }

        for section in &store.sections {
            validate_section(store.kind, section)?;
        }

        validate_policy(store.kind, &store.policy())?;
    }

    Ok(())
}

fn validate_section(kind: StoreKind, section: &SectionConfig) -> Result<(), ConfigError> {
    match (&section.brand, &section.url) {
        (Some(brand), None) => {
            if brand.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "store '{kind}' has a section with an empty brand"
                )));
            }
            if !kind.has_brand_sale_pages() {
                return Err(ConfigError::Validation(format!(
                    "store '{kind}' has no per-brand sale pages; use a 'url' section"
                )));
            }
        }
        (None, Some(url)) => {
            if !url.starts_with(kind.url_prefix()) {
                return Err(ConfigError::Validation(format!(
                    "section url '{url}' does not belong to store '{kind}' (expected prefix {})",
                    kind.url_prefix()
                )));
            }
            if section.category.is_some() {
                return Err(ConfigError::Validation(format!(
                    "section url '{url}' cannot also set a category"
                )));
            }
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "store '{kind}' sections must set exactly one of 'brand' or 'url'"
            )));
        }
    }

    if section.category.is_some() && kind != StoreKind::Cettire {
        return Err(ConfigError::Validation(format!(
            "store '{kind}' does not support category filters"
        )));
    }

    Ok(())
}

fn validate_policy(kind: StoreKind, policy: &PricingPolicy) -> Result<(), ConfigError> {
    let positive = [
        ("currency_margin", policy.currency_margin),
        ("duty_rate", policy.duty_rate),
    ];
    for (name, value) in positive {
        if value <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "store '{kind}' pricing.{name} must be positive, got {value}"
            )));
        }
    }

    let non_negative = [
        ("shipping_fee", policy.shipping_fee),
        ("source_tax_rate", policy.source_tax_rate),
        ("profit_rate", policy.profit_rate),
        ("base_increment", policy.base_increment),
        ("min_profit_floor", policy.min_profit_floor),
    ];
    for (name, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "store '{kind}' pricing.{name} must not be negative, got {value}"
            )));
        }
    }

    if let Some(threshold) = policy.free_shipping_threshold {
        if threshold <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "store '{kind}' pricing.free_shipping_threshold must be positive, got {threshold}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "stores_test.rs"]
mod tests;
