// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use coinkeep::{cli, commands::transactions};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    coinkeep::db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO settings(key,value) VALUES('base_currency','USD');
        INSERT INTO users(name) VALUES('alice');
        INSERT INTO budgets(name,owner_id) VALUES('family',1);
        INSERT INTO memberships(budget_id,user_id,role) VALUES(1,1,'owner');
        INSERT INTO accounts(name,budget_id,user_id,currency,balance,is_shared)
            VALUES('checking',1,1,'USD','500',0);
        INSERT INTO transactions(date,account_id,budget_id,amount,kind,currency,description)
            VALUES('2023-12-01',1,1,'500','income','USD','seed');
        -- a stored rate keeps the engine's rate cache off the network
        INSERT INTO fx_rates(date,base,quote,rate) VALUES('2025-01-02','USD','EUR','0.5');
        "#,
    )
    .unwrap();
    conn
}

#[test]
fn add_records_row_and_moves_balance() {
    let mut conn = setup();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "coinkeep", "tx", "add", "--user", "alice", "--budget", "family", "--date",
        "2025-06-01", "--account", "checking", "--amount", "75.25", "--kind", "expense",
        "--description", "groceries",
    ]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(&mut conn, tx_m).unwrap();
    } else {
        panic!("tx command not parsed");
    }

    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance.parse::<Decimal>().unwrap(), Decimal::new(42475, 2));
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE description='groceries'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    for i in 1..=3 {
        conn.execute(
            "INSERT INTO transactions(date,account_id,budget_id,amount,kind,currency,description)
             VALUES (?1,1,1,'10','expense','USD','')",
            params![format!("2025-01-0{}", i)],
        )
        .unwrap();
    }
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["coinkeep", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2025-01-03");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn rm_reverses_balance_effect() {
    let mut conn = setup();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "coinkeep", "tx", "add", "--user", "alice", "--budget", "family", "--date",
        "2025-06-01", "--account", "checking", "--amount", "100", "--kind", "expense",
    ]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(&mut conn, tx_m).unwrap();
    }
    let id: i64 = conn
        .query_row("SELECT MAX(id) FROM transactions", [], |r| r.get(0))
        .unwrap();

    let id_arg = id.to_string();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "coinkeep",
        "tx",
        "rm",
        "--user",
        "alice",
        "--budget",
        "family",
        "--id",
        id_arg.as_str(),
    ]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(&mut conn, tx_m).unwrap();
    }

    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance.parse::<Decimal>().unwrap(), Decimal::from(500));
}
