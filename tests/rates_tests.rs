// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::anyhow;
use coinkeep::rates::{RateCache, RateOrigin, RateSource, StoredRates};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;

struct Broken;

impl RateSource for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn latest(&self, _base: &str) -> anyhow::Result<HashMap<String, Decimal>> {
        Err(anyhow!("connection refused"))
    }
}

struct Empty;

impl RateSource for Empty {
    fn name(&self) -> &'static str {
        "empty"
    }
    fn latest(&self, _base: &str) -> anyhow::Result<HashMap<String, Decimal>> {
        Ok(HashMap::new())
    }
}

struct Fixed(&'static str, &'static str);

impl RateSource for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }
    fn latest(&self, _base: &str) -> anyhow::Result<HashMap<String, Decimal>> {
        Ok(HashMap::from([(self.0.to_string(), self.1.parse().unwrap())]))
    }
}

#[test]
fn first_answering_source_wins() {
    let cache = RateCache::seed("UAH", &[&Broken, &Empty, &Fixed("USD", "40.0")]);
    assert_eq!(cache.origin(), RateOrigin::Source("fixed"));
    assert_eq!(cache.rate("USD"), Some("40.0".parse().unwrap()));
    assert_eq!(cache.rate("JPY"), None);
}

#[test]
fn all_sources_failing_falls_back_to_constants() {
    let cache = RateCache::seed("UAH", &[&Broken, &Empty]);
    assert_eq!(cache.origin(), RateOrigin::Fallback);
    // The compiled-in approximations exist and satisfy the plausibility
    // rule the currency guard applies.
    let usd = cache.rate("USD").unwrap();
    assert!(usd > Decimal::ONE);
}

#[test]
fn seeding_never_panics_or_errors() {
    let cache = RateCache::seed("XXX", &[]);
    assert_eq!(cache.origin(), RateOrigin::Fallback);
    assert_eq!(cache.base(), "XXX");
}

#[test]
fn stored_rates_invert_and_prefer_newest_row() {
    let mut conn = Connection::open_in_memory().unwrap();
    coinkeep::db::init_schema(&mut conn).unwrap();
    // Stored as base->quote: 1 UAH = 0.05 USD (old), 0.025 USD (new).
    conn.execute_batch(
        r#"
        INSERT INTO fx_rates(date,base,quote,rate) VALUES('2025-07-01','UAH','USD','0.05');
        INSERT INTO fx_rates(date,base,quote,rate) VALUES('2025-08-01','UAH','USD','0.025');
        "#,
    )
    .unwrap();
    let stored = StoredRates::new(&conn);
    let rates = stored.latest("UAH").unwrap();
    // Inverted: 1 USD = 40 UAH, from the newest row.
    assert_eq!(rates.get("USD").copied(), Some(Decimal::from(40)));
}

#[test]
fn stored_rates_empty_without_rows() {
    let mut conn = Connection::open_in_memory().unwrap();
    coinkeep::db::init_schema(&mut conn).unwrap();
    let stored = StoredRates::new(&conn);
    assert!(stored.latest("UAH").unwrap().is_empty());
}
