// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_budget, id_for_user, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let budget = sub.get_one::<String>("budget").unwrap();
            let user = sub.get_one::<String>("user").unwrap();
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            let shared = sub.get_flag("shared");
            let budget_id = id_for_budget(conn, budget)?;
            let user_id = id_for_user(conn, user)?;
            conn.execute(
                "INSERT INTO accounts(name, budget_id, user_id, currency, is_shared)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, budget_id, user_id, ccy, shared],
            )?;
            println!(
                "Added account '{}' ({}, {}{})",
                name,
                budget,
                ccy,
                if shared { ", shared" } else { "" }
            );
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT a.name, b.name, u.name, a.currency, a.balance, a.is_shared
                 FROM accounts a
                 JOIN budgets b ON a.budget_id = b.id
                 JOIN users u ON a.user_id = u.id
                 ORDER BY a.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, bool>(5)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, b, u, c, bal, shared) = row?;
                data.push(vec![
                    n,
                    b,
                    u,
                    c,
                    bal,
                    if shared { "yes".into() } else { "no".into() },
                ]);
            }
            println!(
                "{}",
                pretty_table(
                    &["Name", "Budget", "Owner", "Currency", "Balance", "Shared"],
                    data
                )
            );
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("DELETE FROM accounts WHERE name=?1", params![name])?;
            println!("Removed account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
