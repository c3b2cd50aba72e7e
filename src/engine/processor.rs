// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Session;
use crate::engine::{Processor, Reversal, TransactionDraft, parse_stored_decimal};
use crate::errors::{EngineError, EngineResult};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

/// The single authority that ties a transaction row to exactly one balance
/// delta. Every operation opens one rusqlite transaction, writes the
/// balance before the row, and commits both together; an error on any path
/// drops the transaction and SQLite rolls both writes back.
pub struct LedgerProcessor {
    base: String,
}

struct AccountRow {
    id: i64,
    budget_id: i64,
    user_id: i64,
    balance: Decimal,
    is_shared: bool,
}

impl LedgerProcessor {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
        }
    }

    fn load_account(conn: &Connection, id: i64) -> EngineResult<AccountRow> {
        let row = conn
            .query_row(
                "SELECT id, budget_id, user_id, balance, is_shared FROM accounts WHERE id=?1",
                params![id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, i64>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, budget_id, user_id, balance, is_shared)) = row else {
            return Err(EngineError::NotFound(format!("account {}", id)));
        };
        Ok(AccountRow {
            id,
            budget_id,
            user_id,
            balance: parse_stored_decimal(&balance)?,
            is_shared,
        })
    }

    /// The caller may touch an account it owns, or a shared account on a
    /// budget it can edit.
    fn check_access(account: &AccountRow, session: &Session) -> EngineResult<()> {
        if account.user_id == session.user_id {
            return Ok(());
        }
        if account.is_shared && session.role.can_edit() {
            return Ok(());
        }
        Err(EngineError::AccessDenied(format!(
            "account {} is not accessible to user {}",
            account.id, session.user_id
        )))
    }

    fn write_balance(conn: &Connection, account_id: i64, balance: Decimal) -> EngineResult<()> {
        conn.execute(
            "UPDATE accounts SET balance=?1 WHERE id=?2",
            params![balance.to_string(), account_id],
        )?;
        Ok(())
    }

    fn check_amount(amount: Decimal) -> EngineResult<()> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        Ok(())
    }

    /// Balance write plus row insert, inside an already-open unit of work.
    fn apply_create(
        tx: &rusqlite::Transaction<'_>,
        session: &Session,
        draft: &TransactionDraft,
    ) -> EngineResult<i64> {
        Self::check_amount(draft.amount)?;
        let account = Self::load_account(tx, draft.account_id)?;
        Self::check_access(&account, session)?;

        let balance = account.balance + draft.kind.delta(draft.amount);
        Self::write_balance(tx, account.id, balance)?;

        tx.execute(
            "INSERT INTO transactions(date, account_id, budget_id, amount, kind, currency,
                                      description, category_id, template_id)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                draft.date.to_string(),
                account.id,
                account.budget_id,
                draft.amount.to_string(),
                draft.kind.to_string(),
                draft.currency,
                draft.description,
                draft.category_id,
                draft.template_id
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }
}

impl Processor for LedgerProcessor {
    fn create(
        &self,
        conn: &mut Connection,
        session: &Session,
        draft: TransactionDraft,
    ) -> EngineResult<i64> {
        let tx = conn.transaction()?;
        let id = Self::apply_create(&tx, session, &draft)?;
        tx.commit()?;
        Ok(id)
    }

    fn update(
        &self,
        conn: &mut Connection,
        session: &Session,
        id: i64,
        original: Reversal,
        updated: TransactionDraft,
    ) -> EngineResult<()> {
        Self::check_amount(updated.amount)?;
        let tx = conn.transaction()?;

        let old_account = Self::load_account(&tx, original.account_id)?;
        Self::check_access(&old_account, session)?;

        if original.account_id == updated.account_id {
            let balance = old_account.balance - original.kind.delta(original.amount)
                + updated.kind.delta(updated.amount);
            Self::write_balance(&tx, old_account.id, balance)?;
        } else {
            let new_account = Self::load_account(&tx, updated.account_id)?;
            Self::check_access(&new_account, session)?;
            Self::write_balance(
                &tx,
                old_account.id,
                old_account.balance - original.kind.delta(original.amount),
            )?;
            Self::write_balance(
                &tx,
                new_account.id,
                new_account.balance + updated.kind.delta(updated.amount),
            )?;
        }

        let target_budget: i64 = tx.query_row(
            "SELECT budget_id FROM accounts WHERE id=?1",
            params![updated.account_id],
            |r| r.get(0),
        )?;
        let replaced = tx.execute(
            "UPDATE transactions SET date=?1, account_id=?2, budget_id=?3, amount=?4, kind=?5,
                                     currency=?6, description=?7, category_id=?8
             WHERE id=?9",
            params![
                updated.date.to_string(),
                updated.account_id,
                target_budget,
                updated.amount.to_string(),
                updated.kind.to_string(),
                updated.currency,
                updated.description,
                updated.category_id,
                id
            ],
        )?;
        if replaced == 0 {
            return Err(EngineError::NotFound(format!("transaction {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, conn: &mut Connection, _session: &Session, id: i64) -> EngineResult<()> {
        let tx = conn.transaction()?;
        let Some(existing) = crate::engine::find_transaction(&tx, id)? else {
            // Already gone; deleting twice is not an error.
            return Ok(());
        };

        let account = Self::load_account(&tx, existing.account_id)?;
        let balance = account.balance - existing.kind.delta(existing.amount);
        Self::write_balance(&tx, account.id, balance)?;
        tx.execute("DELETE FROM transactions WHERE id=?1", params![existing.id])?;
        tx.commit()?;
        Ok(())
    }

    fn transfer_to_goal(
        &self,
        conn: &mut Connection,
        session: &Session,
        account_id: i64,
        goal_id: i64,
        amount: Decimal,
    ) -> EngineResult<i64> {
        Self::check_amount(amount)?;
        let tx = conn.transaction()?;

        let goal: Option<(String, String)> = tx
            .query_row(
                "SELECT name, saved FROM goals WHERE id=?1",
                params![goal_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((goal_name, saved)) = goal else {
            return Err(EngineError::NotFound(format!("goal {}", goal_id)));
        };
        let saved = parse_stored_decimal(&saved)?;

        let draft = TransactionDraft {
            date: chrono::Utc::now().date_naive(),
            account_id,
            amount,
            kind: crate::models::TxKind::Expense,
            currency: self.base.clone(),
            description: format!("Goal contribution: {}", goal_name),
            category_id: None,
            template_id: None,
        };
        let id = Self::apply_create(&tx, session, &draft)?;

        // Same unit of work as the expense row: the goal can never grow
        // without the matching transaction committing, or vice versa.
        tx.execute(
            "UPDATE goals SET saved=?1 WHERE id=?2",
            params![(saved + amount).to_string(), goal_id],
        )?;
        tx.commit()?;
        Ok(id)
    }
}
