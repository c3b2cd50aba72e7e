// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use coinkeep::{cli, commands::importer};
use rusqlite::Connection;
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
            VALUES('checking',1,1,'USD','0',0);
        INSERT INTO categories(name) VALUES('Groceries');
        -- 1 USD = 0.5 EUR, so 1 EUR converts to 2 USD
        INSERT INTO fx_rates(date,base,quote,rate) VALUES('2025-01-02','USD','EUR','0.5');
        "#,
    )
    .unwrap();
    conn
}

fn run_import(conn: &mut Connection, path: &str) -> anyhow::Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "coinkeep",
        "import",
        "transactions",
        "--user",
        "alice",
        "--budget",
        "family",
        "--path",
        path,
    ]);
    if let Some(("import", import_m)) = matches.subcommand() {
        importer::handle(conn, import_m)
    } else {
        panic!("import command not parsed");
    }
}

#[test]
fn rows_go_through_the_full_chain() {
    let mut conn = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.csv");
    std::fs::write(
        &path,
        "date,account,amount,kind,currency,category,description\n\
         2025-06-01,checking,100,income,,Groceries,salary\n\
         2025-06-02,checking,9,expense,EUR,,dinner\n",
    )
    .unwrap();

    run_import(&mut conn, path.to_str().unwrap()).unwrap();

    // 100 in, then 9 EUR out converted to 18 USD by the currency guard.
    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance.parse::<Decimal>().unwrap(), Decimal::from(82));

    let (amount, currency, desc): (String, String, String) = conn
        .query_row(
            "SELECT amount, currency, description FROM transactions WHERE kind='expense'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(amount.parse::<Decimal>().unwrap(), Decimal::from(18));
    assert_eq!(currency, "USD");
    assert!(desc.contains("orig 9 EUR"), "no conversion note in '{desc}'");
}

#[test]
fn overdrawing_row_fails_and_keeps_prior_rows() {
    let mut conn = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.csv");
    std::fs::write(
        &path,
        "date,account,amount,kind,currency,category,description\n\
         2025-06-01,checking,50,income,,,salary\n\
         2025-06-02,checking,500,expense,,,rent\n",
    )
    .unwrap();

    let err = run_import(&mut conn, path.to_str().unwrap()).unwrap_err();
    assert!(format!("{err:#}").contains("insufficient funds"));

    // Each row is its own engine operation; the income committed before
    // the bad row stopped the import.
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance.parse::<Decimal>().unwrap(), Decimal::from(50));
}
