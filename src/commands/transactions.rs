// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{build_chain, session_from};
use crate::engine::{Reversal, TransactionDraft, find_transaction};
use crate::models::TxKind;
use crate::utils::{
    id_for_account, id_for_category, maybe_print_json, parse_date, parse_decimal, pretty_table,
};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let account_name = sub.get_one::<String>("account").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let kind = sub
        .get_one::<String>("kind")
        .unwrap()
        .parse::<TxKind>()
        .map_err(|e| anyhow!("{}", e))?;
    let description = sub
        .get_one::<String>("description")
        .map(|s| s.to_string())
        .unwrap_or_default();
    let category = sub.get_one::<String>("category");

    let account_id = id_for_account(conn, account_name)?;
    let account_currency: String = conn.query_row(
        "SELECT currency FROM accounts WHERE id=?1",
        params![account_id],
        |r| r.get(0),
    )?;
    let currency = sub
        .get_one::<String>("currency")
        .map(|s| s.to_uppercase())
        .unwrap_or(account_currency);
    let category_id = match category {
        Some(cat) => Some(id_for_category(conn, cat)?),
        None => None,
    };

    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;
    let id = chain.create(
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
    )?;
    println!(
        "Recorded {} {} on {} at '{}' (tx: {})",
        kind, amount, date, account_name, id
    );
    Ok(())
}

fn edit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let existing =
        find_transaction(conn, id)?.ok_or_else(|| anyhow!("Transaction {} not found", id))?;
    let original = Reversal::of(&existing);

    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => existing.date,
    };
    let account_id = match sub.get_one::<String>("account") {
        Some(name) => id_for_account(conn, name)?,
        None => existing.account_id,
    };
    let amount = match sub.get_one::<String>("amount") {
        Some(s) => parse_decimal(s)?,
        None => existing.amount,
    };
    let kind = match sub.get_one::<String>("kind") {
        Some(s) => s.parse::<TxKind>().map_err(|e| anyhow!("{}", e))?,
        None => existing.kind,
    };
    let currency = sub
        .get_one::<String>("currency")
        .map(|s| s.to_uppercase())
        .unwrap_or(existing.currency);
    let description = sub
        .get_one::<String>("description")
        .map(|s| s.to_string())
        .unwrap_or(existing.description);
    let category_id = match sub.get_one::<String>("category") {
        Some(cat) => Some(id_for_category(conn, cat)?),
        None => existing.category_id,
    };

    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;
    chain.update(
        conn,
        &session,
        id,
        original,
        TransactionDraft {
            date,
            account_id,
            amount,
            kind,
            currency,
            description,
            category_id,
            template_id: existing.template_id,
        },
    )?;
    println!("Updated transaction {}", id);
    Ok(())
}

fn rm(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let session = session_from(conn, sub)?;
    let chain = build_chain(conn)?;
    chain.delete(conn, &session, id)?;
    println!("Removed transaction {}", id);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.account.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.currency.clone(),
                    r.category.clone(),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Account", "Kind", "Amount", "CCY", "Category", "Description"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub account: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub description: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, a.name, t.kind, t.amount, t.currency, c.name, t.description
         FROM transactions t
         LEFT JOIN accounts a ON t.account_id=a.id
         LEFT JOIN categories c ON t.category_id=c.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND a.name=?");
        params_vec.push(acct.into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let account: Option<String> = r.get(2)?;
        let kind: String = r.get(3)?;
        let amount: String = r.get(4)?;
        let currency: String = r.get(5)?;
        let category: Option<String> = r.get(6)?;
        let description: Option<String> = r.get(7)?;
        data.push(TransactionRow {
            id,
            date,
            account: account.unwrap_or_default(),
            kind,
            amount,
            currency,
            category: category.unwrap_or_default(),
            description: description.unwrap_or_default(),
        });
    }
    Ok(data)
}
