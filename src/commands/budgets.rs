// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Role;
use crate::utils::{id_for_budget, id_for_user, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("member", member_m)) => match member_m.subcommand() {
            Some(("add", sub)) => member_add(conn, sub)?,
            Some(("list", sub)) => member_list(conn, sub)?,
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

fn create(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let owner = sub.get_one::<String>("owner").unwrap().trim().to_string();
    let owner_id = id_for_user(conn, &owner)?;
    conn.execute(
        "INSERT INTO budgets(name, owner_id) VALUES (?1, ?2)",
        params![name, owner_id],
    )?;
    let budget_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO memberships(budget_id, user_id, role) VALUES (?1, ?2, 'owner')",
        params![budget_id, owner_id],
    )?;
    println!("Created budget '{}' owned by '{}'", name, owner);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT b.name, u.name, COUNT(m.user_id)
         FROM budgets b
         JOIN users u ON b.owner_id = u.id
         LEFT JOIN memberships m ON m.budget_id = b.id
         GROUP BY b.id ORDER BY b.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (b, o, n) = row?;
        data.push(vec![b, o, n.to_string()]);
    }
    println!("{}", pretty_table(&["Budget", "Owner", "Members"], data));
    Ok(())
}

fn member_add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let budget = sub.get_one::<String>("budget").unwrap().trim().to_string();
    let user = sub.get_one::<String>("user").unwrap().trim().to_string();
    let role_raw = sub.get_one::<String>("role").unwrap().trim().to_lowercase();
    let role = role_raw
        .parse::<Role>()
        .map_err(|e| anyhow!("{}", e))?;

    let budget_id = id_for_budget(conn, &budget)?;
    let user_id = id_for_user(conn, &user)?;
    conn.execute(
        "INSERT INTO memberships(budget_id, user_id, role) VALUES (?1, ?2, ?3)
         ON CONFLICT(budget_id, user_id) DO UPDATE SET role=excluded.role",
        params![budget_id, user_id, role.to_string()],
    )?;
    println!("'{}' is now {} on '{}'", user, role, budget);
    Ok(())
}

fn member_list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let budget = sub.get_one::<String>("budget").unwrap().trim().to_string();
    let budget_id = id_for_budget(conn, &budget)?;
    let mut stmt = conn.prepare(
        "SELECT u.name, m.role FROM memberships m JOIN users u ON m.user_id = u.id
         WHERE m.budget_id=?1 ORDER BY u.name",
    )?;
    let rows = stmt.query_map(params![budget_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (u, role) = row?;
        data.push(vec![u, role]);
    }
    println!("{}", pretty_table(&["User", "Role"], data));
    Ok(())
}
