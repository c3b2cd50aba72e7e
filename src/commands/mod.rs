// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod doctor;
pub mod fx;
pub mod goals;
pub mod importer;
pub mod templates;
pub mod transactions;
pub mod users;

use crate::access::Session;
use crate::engine::{self, Processor};
use crate::rates::{FrankfurterSource, RateCache, StoredRates};
use crate::utils::{get_base_currency, id_for_budget, id_for_user};
use anyhow::Result;
use rusqlite::Connection;

/// Resolve the acting (user, budget) pair from `--user`/`--budget` into an
/// explicit session for the engine.
pub(crate) fn session_from(conn: &Connection, sub: &clap::ArgMatches) -> Result<Session> {
    let user = sub.get_one::<String>("user").unwrap();
    let budget = sub.get_one::<String>("budget").unwrap();
    let user_id = id_for_user(conn, user.trim())?;
    let budget_id = id_for_budget(conn, budget.trim())?;
    Ok(Session::resolve(conn, budget_id, user_id)?)
}

/// Build the canonical processor chain: currency normalization first, then
/// the funds check, then the atomic ledger writer. Rates are seeded once,
/// preferring locally fetched rows over a live lookup.
pub(crate) fn build_chain(conn: &Connection) -> Result<Box<dyn Processor>> {
    let base = get_base_currency(conn)?;
    let stored = StoredRates::new(conn);
    let cache = RateCache::seed(&base, &[&stored, &FrankfurterSource]);
    Ok(engine::chain(&base, cache))
}
