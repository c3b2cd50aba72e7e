// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use coinkeep::access::{Role, Session};
use coinkeep::engine::{self, Processor, Reversal, TransactionDraft};
use coinkeep::errors::EngineError;
use coinkeep::models::TxKind;
use coinkeep::rates::RateCache;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;

fn setup(base: &str, account_balance: &str) -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    coinkeep::db::init_schema(&mut conn).unwrap();
    conn.execute_batch(&format!(
        r#"
        INSERT INTO settings(key,value) VALUES('base_currency','{base}');
        INSERT INTO users(name) VALUES('alice');
        INSERT INTO budgets(name,owner_id) VALUES('family',1);
        INSERT INTO memberships(budget_id,user_id,role) VALUES(1,1,'owner');
        INSERT INTO accounts(name,budget_id,user_id,currency,balance,is_shared)
            VALUES('wallet',1,1,'{base}','{account_balance}',0);
        "#
    ))
    .unwrap();
    conn
}

fn owner() -> Session {
    Session {
        user_id: 1,
        budget_id: 1,
        role: Role::Owner,
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn draft(amount: &str, kind: TxKind, currency: &str) -> TransactionDraft {
    TransactionDraft {
        date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        account_id: 1,
        amount: dec(amount),
        kind,
        currency: currency.into(),
        description: "coffee".into(),
        category_id: None,
        template_id: None,
    }
}

fn chain_with(base: &str, rates: &[(&str, &str)]) -> Box<dyn Processor> {
    let map: HashMap<String, Decimal> = rates
        .iter()
        .map(|(k, v)| (k.to_string(), dec(v)))
        .collect();
    engine::chain(base, RateCache::with_rates(base, map))
}

fn balance(conn: &Connection) -> Decimal {
    let s: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=1", [], |r| r.get(0))
        .unwrap();
    s.parse().unwrap()
}

#[test]
fn expense_over_balance_is_rejected() {
    let mut conn = setup("USD", "100.00");
    let chain = chain_with("USD", &[]);
    let err = chain
        .create(&mut conn, &owner(), draft("150.00", TxKind::Expense, "USD"))
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(balance(&conn), dec("100.00"));
}

#[test]
fn expense_up_to_balance_is_allowed() {
    let mut conn = setup("USD", "100.00");
    let chain = chain_with("USD", &[]);
    chain
        .create(&mut conn, &owner(), draft("100.00", TxKind::Expense, "USD"))
        .unwrap();
    assert_eq!(balance(&conn), dec("0.00"));
}

#[test]
fn funds_check_sees_converted_amount() {
    // 100 USD at rate 40 must be judged as 4000 UAH against a 500 UAH
    // balance, not as 100 units.
    let mut conn = setup("UAH", "500");
    let chain = chain_with("UAH", &[("USD", "40.0")]);
    let err = chain
        .create(&mut conn, &owner(), draft("100", TxKind::Expense, "USD"))
        .unwrap_err();
    match err {
        EngineError::InsufficientFunds { required, .. } => {
            assert_eq!(required, dec("4000.0"));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert_eq!(balance(&conn), dec("500"));
}

#[test]
fn conversion_rewrites_amount_currency_and_description() {
    let mut conn = setup("UAH", "5000");
    let chain = chain_with("UAH", &[("USD", "40.0")]);
    let id = chain
        .create(&mut conn, &owner(), draft("100", TxKind::Expense, "USD"))
        .unwrap();
    let (amount, currency, desc): (String, String, String) = conn
        .query_row(
            "SELECT amount, currency, description FROM transactions WHERE id=?1",
            rusqlite::params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(amount.parse::<Decimal>().unwrap(), dec("4000.0"));
    assert_eq!(currency, "UAH");
    assert!(desc.contains("100 USD"), "note missing from '{desc}'");
    assert_eq!(balance(&conn), dec("1000.0"));
}

#[test]
fn base_currency_passes_through_untouched() {
    let mut conn = setup("UAH", "5000");
    let chain = chain_with("UAH", &[("USD", "40.0")]);
    let id = chain
        .create(&mut conn, &owner(), draft("300", TxKind::Expense, "UAH"))
        .unwrap();
    let desc: String = conn
        .query_row(
            "SELECT description FROM transactions WHERE id=?1",
            rusqlite::params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(desc, "coffee");
    assert_eq!(balance(&conn), dec("4700"));
}

#[test]
fn unknown_rate_skips_conversion() {
    let mut conn = setup("UAH", "5000");
    let chain = chain_with("UAH", &[]);
    let id = chain
        .create(&mut conn, &owner(), draft("100", TxKind::Expense, "USD"))
        .unwrap();
    let (amount, currency): (String, String) = conn
        .query_row(
            "SELECT amount, currency FROM transactions WHERE id=?1",
            rusqlite::params![id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(amount.parse::<Decimal>().unwrap(), dec("100"));
    assert_eq!(currency, "USD");
}

#[test]
fn implausible_rate_skips_conversion() {
    let mut conn = setup("UAH", "5000");
    let chain = chain_with("UAH", &[("USD", "0.5")]);
    let id = chain
        .create(&mut conn, &owner(), draft("100", TxKind::Expense, "USD"))
        .unwrap();
    let amount: String = conn
        .query_row(
            "SELECT amount FROM transactions WHERE id=?1",
            rusqlite::params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(amount.parse::<Decimal>().unwrap(), dec("100"));
}

#[test]
fn update_checks_net_effect_on_same_account() {
    let mut conn = setup("USD", "100");
    let chain = chain_with("USD", &[]);
    let id = chain
        .create(&mut conn, &owner(), draft("80", TxKind::Expense, "USD"))
        .unwrap();
    assert_eq!(balance(&conn), dec("20"));

    let original = Reversal {
        account_id: 1,
        amount: dec("80"),
        kind: TxKind::Expense,
    };
    // Raising 80 -> 90 only costs 10 more; raw 90 > 20 but net is fine.
    chain
        .update(
            &mut conn,
            &owner(),
            id,
            original,
            draft("90", TxKind::Expense, "USD"),
        )
        .unwrap();
    assert_eq!(balance(&conn), dec("10"));

    // 90 -> 190 would overdraw even after the 90 is un-applied.
    let original = Reversal {
        account_id: 1,
        amount: dec("90"),
        kind: TxKind::Expense,
    };
    let err = chain
        .update(
            &mut conn,
            &owner(),
            id,
            original,
            draft("190", TxKind::Expense, "USD"),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(balance(&conn), dec("10"));
}

#[test]
fn update_onto_other_account_checks_raw_balance() {
    let mut conn = setup("USD", "1000");
    conn.execute(
        "INSERT INTO accounts(name,budget_id,user_id,currency,balance,is_shared)
         VALUES('petty cash',1,1,'USD','30',0)",
        [],
    )
    .unwrap();
    let chain = chain_with("USD", &[]);
    let id = chain
        .create(&mut conn, &owner(), draft("50", TxKind::Expense, "USD"))
        .unwrap();
    let original = Reversal {
        account_id: 1,
        amount: dec("50"),
        kind: TxKind::Expense,
    };
    let mut moved = draft("50", TxKind::Expense, "USD");
    moved.account_id = 2;
    let err = chain
        .update(&mut conn, &owner(), id, original, moved)
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
}

#[test]
fn deleting_income_cannot_overdraw() {
    let mut conn = setup("USD", "0");
    let chain = chain_with("USD", &[]);
    let income = chain
        .create(&mut conn, &owner(), draft("100", TxKind::Income, "USD"))
        .unwrap();
    chain
        .create(&mut conn, &owner(), draft("80", TxKind::Expense, "USD"))
        .unwrap();
    // Balance is 20; taking the 100 income back out would leave -80.
    let err = chain.delete(&mut conn, &owner(), income).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(balance(&conn), dec("20"));
}

#[test]
fn goal_transfer_is_checked_like_an_expense() {
    let mut conn = setup("USD", "100");
    conn.execute(
        "INSERT INTO goals(name,budget_id,target,saved,currency) VALUES('bike',1,'500','0','USD')",
        [],
    )
    .unwrap();
    let chain = chain_with("USD", &[]);
    let err = chain
        .transfer_to_goal(&mut conn, &owner(), 1, 1, dec("150"))
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert_eq!(balance(&conn), dec("100"));
    let saved: String = conn
        .query_row("SELECT saved FROM goals WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(saved.parse::<Decimal>().unwrap(), Decimal::ZERO);
}
