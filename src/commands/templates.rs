// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{build_chain, session_from};
use crate::models::{Recurrence, TxKind};
use crate::recurrence::{run_due, weekday_to_stored};
use crate::utils::{
    id_for_account, id_for_budget, id_for_category, id_for_user, parse_date, parse_decimal,
    pretty_table,
};
use anyhow::{Result, anyhow, bail};
use chrono::Weekday;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("run", sub)) => run(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn parse_weekday(s: &str) -> Result<Weekday> {
    match s {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        other => bail!("Invalid weekday '{}', expected mon..sun", other),
    }
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let account = sub.get_one::<String>("account").unwrap();
    let kind = sub
        .get_one::<String>("kind")
        .unwrap()
        .parse::<TxKind>()
        .map_err(|e| anyhow!("{}", e))?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let recurrence = sub
        .get_one::<String>("recurrence")
        .unwrap()
        .parse::<Recurrence>()
        .map_err(|e| anyhow!("{}", e))?;
    let interval = *sub.get_one::<u32>("interval").unwrap();
    if interval < 1 {
        bail!("Interval must be at least 1");
    }
    let anchor_day = sub.get_one::<u32>("anchor-day").copied();
    if let Some(day) = anchor_day {
        if !(1..=31).contains(&day) {
            bail!("Anchor day must be 1-31, got {}", day);
        }
    }
    let anchor_weekday = sub
        .get_one::<String>("anchor-weekday")
        .map(|s| parse_weekday(s.trim()))
        .transpose()?;
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;

    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap().trim())?;
    let budget_id = id_for_budget(conn, sub.get_one::<String>("budget").unwrap().trim())?;
    let account_id = id_for_account(conn, account)?;
    let account_currency: String = conn.query_row(
        "SELECT currency FROM accounts WHERE id=?1",
        params![account_id],
        |r| r.get(0),
    )?;
    let currency = sub
        .get_one::<String>("currency")
        .map(|s| s.to_uppercase())
        .unwrap_or(account_currency);
    let category_id = match sub.get_one::<String>("category") {
        Some(cat) => Some(id_for_category(conn, cat)?),
        None => None,
    };

    conn.execute(
        "INSERT INTO templates(name, budget_id, user_id, account_id, category_id, kind, amount,
                               currency, recurrence, interval, anchor_day, anchor_weekday,
                               start_date)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            name,
            budget_id,
            user_id,
            account_id,
            category_id,
            kind.to_string(),
            amount.to_string(),
            currency,
            recurrence.to_string(),
            interval,
            anchor_day,
            anchor_weekday.map(weekday_to_stored),
            start.to_string()
        ],
    )?;
    println!(
        "Added template '{}': {} {} {} every {} {}(s) from {}",
        name, kind, amount, currency, interval, recurrence, start
    );
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT t.name, a.name, t.kind, t.amount, t.currency, t.recurrence, t.interval,
                t.start_date, COALESCE(t.last_run, '')
         FROM templates t JOIN accounts a ON t.account_id = a.id
         ORDER BY t.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, String>(8)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, account, kind, amount, ccy, rec, interval, start, last) = row?;
        data.push(vec![
            name,
            account,
            kind,
            amount,
            ccy,
            format!("every {} {}(s)", interval, rec),
            start,
            last,
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Template", "Account", "Kind", "Amount", "CCY", "Schedule", "Start", "Last run"],
            data
        )
    );
    Ok(())
}

fn run(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = match sub.get_one::<String>("today") {
        Some(s) => parse_date(s)?,
        None => chrono::Utc::now().date_naive(),
    };
    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;

    let runs = run_due(conn, &session, chain.as_ref(), today)?;
    if runs.is_empty() {
        println!("No recurring templates for this user.");
        return Ok(());
    }
    let mut data = Vec::new();
    for run in &runs {
        data.push(vec![
            run.name.clone(),
            run.materialized.len().to_string(),
            run.materialized
                .last()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            run.error.clone().unwrap_or_default(),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Template", "Materialized", "Through", "Error"], data)
    );
    Ok(())
}
