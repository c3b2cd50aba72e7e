// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

/// Audits the one invariant everything else depends on: each account's
/// stored balance equals the signed sum of its ledger rows.
pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Balance drift
    let mut stmt = conn.prepare("SELECT id, name, balance FROM accounts ORDER BY name")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let name: String = r.get(1)?;
        let stored_s: String = r.get(2)?;
        let stored = stored_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' on '{}'", stored_s, name))?;

        let mut tstmt =
            conn.prepare("SELECT amount, kind FROM transactions WHERE account_id=?1")?;
        let mut trs = tstmt.query(rusqlite::params![id])?;
        let mut ledger = Decimal::ZERO;
        while let Some(t) = trs.next()? {
            let amount_s: String = t.get(0)?;
            let kind: String = t.get(1)?;
            let amount = amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in transactions", amount_s))?;
            if kind == "income" {
                ledger += amount;
            } else {
                ledger -= amount;
            }
        }
        if ledger != stored {
            rows.push(vec![
                "balance_drift".into(),
                format!("{}: stored {} vs ledger {}", name, stored, ledger),
            ]);
        }
    }

    // 2) Currencies in use with no stored rate
    let base = crate::utils::get_base_currency(conn)?;
    let mut stmt2 = conn.prepare(
        "SELECT DISTINCT currency FROM accounts
         UNION SELECT DISTINCT currency FROM templates",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let ccy: String = r.get(0)?;
        if ccy == base {
            continue;
        }
        let mut st = conn
            .prepare("SELECT 1 FROM fx_rates WHERE base=?1 AND quote=?2 ORDER BY date DESC LIMIT 1")?;
        let ok: Option<i32> = st.query_row((&base, &ccy), |r| r.get(0)).optional()?;
        if ok.is_none() {
            rows.push(vec!["missing_fx".into(), ccy]);
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
