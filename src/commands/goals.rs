// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{build_chain, session_from};
use crate::utils::{id_for_account, id_for_budget, id_for_goal, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("contribute", sub)) => contribute(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let budget = sub.get_one::<String>("budget").unwrap().trim().to_string();
    let target = parse_decimal(sub.get_one::<String>("target").unwrap().trim())?;
    let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let budget_id = id_for_budget(conn, &budget)?;
    conn.execute(
        "INSERT INTO goals(name, budget_id, target, currency) VALUES (?1, ?2, ?3, ?4)",
        params![name, budget_id, target.to_string(), ccy],
    )?;
    println!("Added goal '{}' ({} {})", name, target, ccy);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT g.name, b.name, g.target, g.saved, g.currency
         FROM goals g JOIN budgets b ON g.budget_id = b.id
         ORDER BY g.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (g, b, target, saved, ccy) = row?;
        data.push(vec![g, b, target, saved, ccy]);
    }
    println!(
        "{}",
        pretty_table(&["Goal", "Budget", "Target", "Saved", "Currency"], data)
    );
    Ok(())
}

fn contribute(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let goal = sub.get_one::<String>("goal").unwrap().trim().to_string();
    let account = sub.get_one::<String>("account").unwrap().trim().to_string();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;

    let goal_id = id_for_goal(conn, &goal)?;
    let account_id = id_for_account(conn, &account)?;
    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;
    let id = chain.transfer_to_goal(conn, &session, account_id, goal_id, amount)?;
    println!(
        "Contributed {} from '{}' to '{}' (tx: {})",
        amount, account, goal, id
    );
    Ok(())
}
