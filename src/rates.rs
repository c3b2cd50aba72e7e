// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// Last-resort approximations, base units per unit of foreign currency,
/// frozen at release time. Used only when every configured source fails or
/// answers empty; `RateCache::origin` lets callers surface the staleness.
static FALLBACK_RATES: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    HashMap::from([
        ("USD", Decimal::new(415, 1)),  // 41.5
        ("EUR", Decimal::new(450, 1)),  // 45.0
        ("GBP", Decimal::new(520, 1)),  // 52.0
    ])
});

/// A provider of the latest exchange rates relative to a base currency.
/// The returned map is foreign code -> base units per 1 foreign unit and
/// may be empty on a soft failure.
pub trait RateSource {
    fn name(&self) -> &'static str;
    fn latest(&self, base: &str) -> Result<HashMap<String, Decimal>>;
}

#[derive(Debug, Deserialize)]
struct Latest {
    rates: HashMap<String, f64>,
    #[serde(rename = "base")]
    _base: String,
}

/// Live rates from Frankfurter (ECB). The API quotes `base -> quote`
/// (1 base = r quote), so quotes are inverted on the way in.
pub struct FrankfurterSource;

impl RateSource for FrankfurterSource {
    fn name(&self) -> &'static str {
        "frankfurter"
    }

    fn latest(&self, base: &str) -> Result<HashMap<String, Decimal>> {
        let url = format!("https://api.frankfurter.dev/latest?from={base}");
        let client = crate::utils::http_client()?;
        let resp = client.get(url).send()?.error_for_status()?;
        let s: Latest = resp.json()?;
        let mut out = HashMap::new();
        for (quote, rate) in s.rates {
            let d = rate
                .to_string()
                .parse::<Decimal>()
                .with_context(|| format!("Invalid rate '{}' for {}/{}", rate, base, quote))?;
            if !d.is_zero() {
                out.insert(quote, Decimal::ONE / d);
            }
        }
        Ok(out)
    }
}

/// Rates previously persisted to the fx_rates table (newest row per
/// quote), for running without network access.
pub struct StoredRates<'c> {
    conn: &'c Connection,
}

impl<'c> StoredRates<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl RateSource for StoredRates<'_> {
    fn name(&self) -> &'static str {
        "fx_rates table"
    }

    fn latest(&self, base: &str) -> Result<HashMap<String, Decimal>> {
        let mut stmt = self.conn.prepare(
            "SELECT quote, rate, MAX(date) FROM fx_rates WHERE base=?1 GROUP BY quote",
        )?;
        let rows = stmt.query_map(params![base], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut out = HashMap::new();
        for row in rows {
            let (quote, rate_s) = row?;
            let d = rate_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid rate '{}' for {}/{}", rate_s, base, quote))?;
            if !d.is_zero() {
                out.insert(quote, Decimal::ONE / d);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    Source(&'static str),
    Fallback,
}

/// Rate table seeded once at construction. Sources are tried in order;
/// the first that answers with a non-empty map wins. Seeding never fails:
/// with no usable source the compiled-in approximations apply.
pub struct RateCache {
    base: String,
    rates: HashMap<String, Decimal>,
    origin: RateOrigin,
}

impl RateCache {
    pub fn seed(base: &str, sources: &[&dyn RateSource]) -> RateCache {
        for source in sources {
            match source.latest(base) {
                Ok(rates) if !rates.is_empty() => {
                    return RateCache {
                        base: base.to_string(),
                        rates,
                        origin: RateOrigin::Source(source.name()),
                    };
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(source = source.name(), %base, "rate source failed: {err:#}");
                }
            }
        }
        warn!(%base, "no rate source answered, using compiled-in fallback rates");
        let rates = FALLBACK_RATES
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        RateCache {
            base: base.to_string(),
            rates,
            origin: RateOrigin::Fallback,
        }
    }

    /// A cache with explicit contents, for composition roots and tests
    /// that already hold the rates.
    pub fn with_rates(base: &str, rates: HashMap<String, Decimal>) -> RateCache {
        RateCache {
            base: base.to_string(),
            rates,
            origin: RateOrigin::Source("explicit"),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn origin(&self) -> RateOrigin {
        self.origin
    }

    /// Base units per 1 unit of `ccy`, if known.
    pub fn rate(&self, ccy: &str) -> Option<Decimal> {
        self.rates.get(ccy).copied()
    }
}
