// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{build_chain, session_from};
use crate::engine::TransactionDraft;
use crate::models::TxKind;
use crate::utils::{id_for_category, parse_date, parse_decimal};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use rusqlite::{Connection, params};
use std::collections::{HashMap, hash_map::Entry};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        _ => Ok(()),
    }
}

/// Columns: date, account, amount, kind, currency (optional), category
/// (optional), description (optional). Every row goes through the full
/// decorator chain, so imports get currency normalization and funds checks
/// exactly like interactive entry; each row commits on its own.
fn import_transactions(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;

    let mut account_cache: HashMap<String, (i64, String)> = HashMap::new();
    let mut category_cache: HashMap<String, i64> = HashMap::new();
    let mut imported = 0usize;

    for result in rdr.records() {
        let rec = result?;
        let date_raw = rec.get(0).context("date missing")?.trim().to_string();
        let account = rec.get(1).context("account missing")?.trim().to_string();
        let amount_raw = rec.get(2).context("amount missing")?.trim().to_string();
        let kind_raw = rec.get(3).context("kind missing")?.trim().to_string();
        let csv_currency = rec.get(4).unwrap_or("").trim().to_uppercase();
        let category = rec.get(5).unwrap_or("").trim().to_string();
        let description = rec.get(6).map(|s| s.trim()).unwrap_or("").to_string();

        let date = parse_date(&date_raw)
            .with_context(|| format!("Invalid transaction date '{}'", date_raw))?;
        let amount = parse_decimal(&amount_raw)
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw, account))?;
        let kind = kind_raw
            .parse::<TxKind>()
            .map_err(|e| anyhow!("{}", e))?;

        let (account_id, account_currency) = match account_cache.entry(account.clone()) {
            Entry::Occupied(entry) => entry.into_mut().clone(),
            Entry::Vacant(entry) => {
                let fetched: (i64, String) = conn
                    .query_row(
                        "SELECT id, currency FROM accounts WHERE name=?1",
                        params![&account],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .with_context(|| format!("Account '{}' not found", account))?;
                entry.insert(fetched).clone()
            }
        };
        let category_id = if category.is_empty() {
            None
        } else {
            let cat_id = match category_cache.entry(category.clone()) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let fetched = id_for_category(conn, &category)?;
                    *entry.insert(fetched)
                }
            };
            Some(cat_id)
        };

        let currency = if csv_currency.is_empty() {
            account_currency
        } else {
            csv_currency
        };

        chain
            .create(
                conn,
                &session,
                TransactionDraft {
                    date,
                    account_id,
                    amount,
                    kind,
                    currency,
                    description,
                    category_id,
                    template_id: None,
                },
            )
            .with_context(|| format!("Row {} ({} {})", imported + 1, account, amount_raw))?;
        imported += 1;
    }
    println!("Imported {} transactions from {}", imported, path);
    Ok(())
}
