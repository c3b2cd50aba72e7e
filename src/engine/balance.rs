// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Session;
use crate::engine::{Processor, Reversal, TransactionDraft, parse_stored_decimal};
use crate::errors::{EngineError, EngineResult};
use crate::models::TxKind;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

/// Refuses operations that would drive an account balance negative. Sits
/// downstream of the currency guard so every amount it compares is already
/// in base currency.
pub struct BalanceGuard {
    inner: Box<dyn Processor>,
}

impl BalanceGuard {
    pub fn new(inner: Box<dyn Processor>) -> Self {
        Self { inner }
    }

    fn balance_of(conn: &Connection, account_id: i64) -> EngineResult<Decimal> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT balance FROM accounts WHERE id=?1",
                params![account_id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(s) = stored else {
            return Err(EngineError::NotFound(format!("account {}", account_id)));
        };
        parse_stored_decimal(&s)
    }

    fn require(balance: Decimal, required: Decimal) -> EngineResult<()> {
        if balance < required {
            return Err(EngineError::InsufficientFunds { balance, required });
        }
        Ok(())
    }
}

impl Processor for BalanceGuard {
    fn create(
        &self,
        conn: &mut Connection,
        session: &Session,
        draft: TransactionDraft,
    ) -> EngineResult<i64> {
        if draft.kind == TxKind::Expense {
            let balance = Self::balance_of(conn, draft.account_id)?;
            Self::require(balance, draft.amount)?;
        }
        self.inner.create(conn, session, draft)
    }

    fn update(
        &self,
        conn: &mut Connection,
        session: &Session,
        id: i64,
        original: Reversal,
        updated: TransactionDraft,
    ) -> EngineResult<()> {
        if updated.kind == TxKind::Expense {
            if updated.account_id == original.account_id {
                // The original's effect is un-applied in the same
                // operation, so validate the net result, not the raw new
                // amount.
                let balance = Self::balance_of(conn, updated.account_id)?;
                let projected = balance - original.kind.delta(original.amount)
                    + updated.kind.delta(updated.amount);
                if projected < Decimal::ZERO {
                    return Err(EngineError::InsufficientFunds {
                        balance,
                        required: updated.amount,
                    });
                }
            } else {
                let balance = Self::balance_of(conn, updated.account_id)?;
                Self::require(balance, updated.amount)?;
            }
        }
        self.inner.update(conn, session, id, original, updated)
    }

    fn delete(&self, conn: &mut Connection, session: &Session, id: i64) -> EngineResult<()> {
        // Removing an income record takes its amount back out of the
        // balance, symmetric to spending it.
        if let Some(existing) = crate::engine::find_transaction(conn, id)? {
            if existing.kind == TxKind::Income {
                let balance = Self::balance_of(conn, existing.account_id)?;
                Self::require(balance, existing.amount)?;
            }
        }
        self.inner.delete(conn, session, id)
    }

    fn transfer_to_goal(
        &self,
        conn: &mut Connection,
        session: &Session,
        account_id: i64,
        goal_id: i64,
        amount: Decimal,
    ) -> EngineResult<i64> {
        let balance = Self::balance_of(conn, account_id)?;
        Self::require(balance, amount)?;
        self.inner
            .transfer_to_goal(conn, session, account_id, goal_id, amount)
    }
}
