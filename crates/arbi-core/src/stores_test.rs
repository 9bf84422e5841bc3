use std::path::Path;

use super::*;

fn brand_section(brand: &str) -> SectionConfig {
    SectionConfig {
        brand: Some(brand.to_string()),
        url: None,
        category: None,
    }
}

fn store(kind: StoreKind, sections: Vec<SectionConfig>) -> StoreConfig {
    StoreConfig {
        kind,
        currency: None,
        pricing: PricingOverrides::default(),
        sections,
    }
}

#[test]
fn store_kind_display_and_parse_round_trip() {
    for kind in StoreKind::ALL {
        assert_eq!(kind.to_string().parse::<StoreKind>().unwrap(), kind);
    }
    assert_eq!(" Cettire ".parse::<StoreKind>().unwrap(), StoreKind::Cettire);
    assert!("ssense".parse::<StoreKind>().is_err());
}

#[test]
fn category_parse_is_case_insensitive() {
    assert_eq!("bags".parse::<Category>().unwrap(), Category::Bags);
    assert_eq!("ACCESSORIES".parse::<Category>().unwrap(), Category::Accessories);
    assert!("shoes".parse::<Category>().is_err());
}

#[test]
fn default_currency_follows_store() {
    assert_eq!(StoreKind::Upthere.default_currency(), Some(AUD_LABEL));
    assert_eq!(StoreKind::Supply.default_currency(), Some(AUD_LABEL));
    assert_eq!(StoreKind::Cettire.default_currency(), None);
}

#[test]
fn default_policies_differ_per_store() {
    let upthere = StoreKind::Upthere.default_policy();
    assert_eq!(upthere.source_tax_rate, Decimal::new(1, 1));
    assert!(!upthere.use_max_profit);

    let supply = StoreKind::Supply.default_policy();
    assert!(supply.use_max_profit);
    assert_eq!(supply.profit_rate, Decimal::new(11, 2));

    let cettire = StoreKind::Cettire.default_policy();
    assert_eq!(cettire.currency_margin, Decimal::ONE);
    assert_eq!(cettire.free_shipping_threshold, Some(Decimal::from(7000)));
    assert_eq!(cettire.min_profit_floor, Decimal::from(500));
}

#[test]
fn overrides_replace_only_given_fields() {
    let mut config = store(StoreKind::Supply, vec![brand_section("stussy")]);
    config.pricing.shipping_fee = Some(Decimal::from(900));
    config.pricing.use_max_profit = Some(false);

    let policy = config.policy();
    assert_eq!(policy.shipping_fee, Decimal::from(900));
    assert!(!policy.use_max_profit);
    assert_eq!(policy.profit_rate, Decimal::new(11, 2));
}

#[test]
fn currency_label_prefers_explicit_value() {
    let mut config = store(StoreKind::Upthere, vec![brand_section("stussy")]);
    assert_eq!(config.currency_label(), Some(AUD_LABEL));
    config.currency = Some("Euro (EUR)".to_string());
    assert_eq!(config.currency_label(), Some("Euro (EUR)"));
}

#[test]
fn validate_rejects_empty_catalogue() {
    let err = validate_stores(&StoresFile { stores: vec![] }).unwrap_err();
    assert!(err.to_string().contains("at least one store"));
}

#[test]
fn validate_rejects_duplicate_store() {
    let stores_file = StoresFile {
        stores: vec![
            store(StoreKind::Upthere, vec![brand_section("a")]),
            store(StoreKind::Upthere, vec![brand_section("b")]),
        ],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

fn url_section(url: &str) -> SectionConfig {
    SectionConfig {
        brand: None,
        url: Some(url.to_string()),
        category: None,
    }
}

#[test]
fn validate_rejects_brand_section_for_supply() {
    let stores_file = StoresFile {
        stores: vec![store(StoreKind::Supply, vec![brand_section("stussy")])],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("no per-brand sale pages"));
}

#[test]
fn validate_accepts_url_section_for_supply() {
    let stores_file = StoresFile {
        stores: vec![store(
            StoreKind::Supply,
            vec![url_section("https://www.supplystore.com.au/sale")],
        )],
    };
    assert!(validate_stores(&stores_file).is_ok());
}

#[test]
fn validate_rejects_store_without_sections() {
    let stores_file = StoresFile {
        stores: vec![store(StoreKind::Supply, vec![])],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("no sections"));
}

#[test]
fn validate_rejects_foreign_section_url() {
    let section = SectionConfig {
        brand: None,
        url: Some("https://www.cettire.com/tw/collections/sale/acne".to_string()),
        category: None,
    };
    let stores_file = StoresFile {
        stores: vec![store(StoreKind::Upthere, vec![section])],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("does not belong to store 'upthere'"));
}

#[test]
fn validate_rejects_section_with_brand_and_url() {
    let section = SectionConfig {
        brand: Some("acne".to_string()),
        url: Some("https://uptherestore.com/collections/sale".to_string()),
        category: None,
    };
    let stores_file = StoresFile {
        stores: vec![store(StoreKind::Upthere, vec![section])],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("exactly one"));
}

#[test]
fn validate_rejects_category_outside_cettire() {
    let section = SectionConfig {
        category: Some(Category::Bags),
        ..brand_section("acne")
    };
    let stores_file = StoresFile {
        stores: vec![store(StoreKind::Upthere, vec![section])],
    };
    let err = validate_stores(&stores_file).unwrap_err();
    assert!(err.to_string().contains("category"));
}

#[test]
fn validate_rejects_non_positive_duty() {
    let mut config = store(StoreKind::Upthere, vec![brand_section("a")]);
    config.pricing.duty_rate = Some(Decimal::ZERO);
    let err = validate_stores(&StoresFile {
        stores: vec![config],
    })
    .unwrap_err();
    assert!(err.to_string().contains("duty_rate must be positive"));
}

#[test]
fn validate_rejects_negative_shipping() {
    let mut config = store(StoreKind::Cettire, vec![brand_section("a")]);
    config.pricing.shipping_fee = Some(Decimal::from(-1));
    let err = validate_stores(&StoresFile {
        stores: vec![config],
    })
    .unwrap_err();
    assert!(err.to_string().contains("shipping_fee must not be negative"));
}

#[test]
fn parse_stores_reads_overrides_and_categories() {
    let yaml = r#"
stores:
  - kind: cettire
    pricing:
      min_profit_floor: 800
      profit_rate: 0.1
    sections:
      - brand: Acne Studios
      - brand: Jil Sander
        category: Bags
  - kind: upthere
    currency: Australian Dollar (AUD)
    sections:
      - url: https://uptherestore.com/collections/sale-our-legacy
"#;
    let stores_file = parse_stores(yaml).unwrap();
    assert_eq!(stores_file.stores.len(), 2);

    let cettire = stores_file.store(StoreKind::Cettire).unwrap();
    let policy = cettire.policy();
    assert_eq!(policy.min_profit_floor, Decimal::from(800));
    assert_eq!(policy.profit_rate, Decimal::new(1, 1));
    assert_eq!(cettire.sections[1].category, Some(Category::Bags));

    let upthere = stores_file.store(StoreKind::Upthere).unwrap();
    assert!(upthere.sections[0].url.is_some());
    assert!(stores_file.store(StoreKind::Supply).is_none());
}

#[test]
fn parse_stores_rejects_unknown_pricing_field() {
    let yaml = r"
stores:
  - kind: supply
    pricing:
      markup: 2
    sections:
      - brand: stussy
";
    let err = parse_stores(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::StoresFileParse(_)));
}

#[test]
fn load_stores_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("config/stores.yaml");

    let stores_file = load_stores(&path).expect("failed to load stores.yaml");
    for kind in StoreKind::ALL {
        assert!(
            stores_file.store(kind).is_some(),
            "stores.yaml should configure {kind}"
        );
    }
}

#[test]
fn load_stores_missing_file_is_io_error() {
    let err = load_stores(Path::new("/nonexistent/stores.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::StoresFileIo { .. }));
}
