// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Session;
use crate::errors::EngineResult;
use crate::models::{Transaction, TxKind};
use crate::rates::RateCache;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

mod balance;
mod currency;
mod processor;

pub use balance::BalanceGuard;
pub use currency::CurrencyGuard;
pub use processor::LedgerProcessor;

/// A transaction as submitted, before it has an id. Amount is a positive
/// magnitude; the sign of the balance effect comes from `kind` alone.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub account_id: i64,
    pub amount: Decimal,
    pub kind: TxKind,
    pub currency: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub template_id: Option<i64>,
}

/// The last committed state of a transaction, as far as balance effects
/// are concerned. Passed explicitly into update so the entity row is never
/// used as a scratch area for its own pre-edit snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Reversal {
    pub account_id: i64,
    pub amount: Decimal,
    pub kind: TxKind,
}

impl Reversal {
    pub fn of(tx: &Transaction) -> Reversal {
        Reversal {
            account_id: tx.account_id,
            amount: tx.amount,
            kind: tx.kind,
        }
    }
}

/// The four-operation engine contract. The base processor and every
/// decorator implement it; each operation runs to completion (commit or
/// rollback) before the caller's next call begins.
pub trait Processor {
    /// Persist a new transaction and its balance effect atomically.
    /// Returns the new row id.
    fn create(
        &self,
        conn: &mut Connection,
        session: &Session,
        draft: TransactionDraft,
    ) -> EngineResult<i64>;

    /// Reverse `original`'s balance effect, apply `updated`'s, and replace
    /// the row wholesale, all in one unit of work.
    fn update(
        &self,
        conn: &mut Connection,
        session: &Session,
        id: i64,
        original: Reversal,
        updated: TransactionDraft,
    ) -> EngineResult<()>;

    /// Reverse and remove a transaction. Deleting an absent id is a no-op.
    fn delete(&self, conn: &mut Connection, session: &Session, id: i64) -> EngineResult<()>;

    /// Record a goal contribution as an EXPENSE against the source account
    /// and grow the goal's saved amount in the same unit of work.
    fn transfer_to_goal(
        &self,
        conn: &mut Connection,
        session: &Session,
        account_id: i64,
        goal_id: i64,
        amount: Decimal,
    ) -> EngineResult<i64>;
}

/// Composition root. The funds check sits inside the currency guard so it
/// always validates the converted, base-currency amount; wiring the two
/// the other way round would check raw foreign amounts against base
/// balances.
pub fn chain(base: &str, rates: RateCache) -> Box<dyn Processor> {
    let atomic = LedgerProcessor::new(base);
    let funds = BalanceGuard::new(Box::new(atomic));
    Box::new(CurrencyGuard::new(Box::new(funds), rates))
}

pub fn find_transaction(conn: &Connection, id: i64) -> EngineResult<Option<Transaction>> {
    let row = conn
        .query_row(
            "SELECT id, date, account_id, budget_id, amount, kind, currency, description,
                    category_id, template_id
             FROM transactions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, i64>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                    r.get::<_, Option<i64>>(8)?,
                    r.get::<_, Option<i64>>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((id, date, account_id, budget_id, amount, kind, currency, description, category_id, template_id)) =
        row
    else {
        return Ok(None);
    };
    let tx = Transaction {
        id,
        date: parse_stored_date(&date)?,
        account_id,
        budget_id,
        amount: parse_stored_decimal(&amount)?,
        kind: parse_stored_kind(&kind)?,
        currency,
        description,
        category_id,
        template_id,
    };
    Ok(Some(tx))
}

pub(crate) fn parse_stored_date(s: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| crate::errors::EngineError::Configuration(format!("bad stored date '{}'", s)))
}

pub(crate) fn parse_stored_decimal(s: &str) -> EngineResult<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| crate::errors::EngineError::Configuration(format!("bad stored amount '{}'", s)))
}

pub(crate) fn parse_stored_kind(s: &str) -> EngineResult<TxKind> {
    s.parse::<TxKind>().map_err(crate::errors::EngineError::Configuration)
}
