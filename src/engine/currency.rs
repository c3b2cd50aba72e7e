// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Session;
use crate::engine::{Processor, Reversal, TransactionDraft};
use crate::errors::EngineResult;
use crate::rates::RateCache;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::warn;

/// Normalizes every incoming create/update to the base currency before the
/// rest of the chain sees it. Holds the rate table it was constructed
/// with; a missing or implausible rate skips conversion with a diagnostic
/// instead of failing the operation.
pub struct CurrencyGuard {
    inner: Box<dyn Processor>,
    rates: RateCache,
}

impl CurrencyGuard {
    pub fn new(inner: Box<dyn Processor>, rates: RateCache) -> Self {
        Self { inner, rates }
    }

    fn normalize(&self, mut draft: TransactionDraft) -> TransactionDraft {
        if draft.currency == self.rates.base() {
            return draft;
        }
        match self.rates.rate(&draft.currency) {
            Some(rate) if rate > Decimal::ONE => {
                let converted = draft.amount * rate;
                draft.description.push_str(&format!(
                    " (orig {} {} @ {})",
                    draft.amount, draft.currency, rate
                ));
                draft.amount = converted;
                draft.currency = self.rates.base().to_string();
                draft
            }
            Some(rate) => {
                warn!(
                    currency = %draft.currency,
                    %rate,
                    "implausible rate, leaving amount unconverted"
                );
                draft
            }
            None => {
                warn!(
                    currency = %draft.currency,
                    base = %self.rates.base(),
                    "no rate known, leaving amount unconverted"
                );
                draft
            }
        }
    }
}

impl Processor for CurrencyGuard {
    fn create(
        &self,
        conn: &mut Connection,
        session: &Session,
        draft: TransactionDraft,
    ) -> EngineResult<i64> {
        self.inner.create(conn, session, self.normalize(draft))
    }

    fn update(
        &self,
        conn: &mut Connection,
        session: &Session,
        id: i64,
        original: Reversal,
        updated: TransactionDraft,
    ) -> EngineResult<()> {
        // The original was stored already converted; only the replacement
        // needs normalizing.
        self.inner
            .update(conn, session, id, original, self.normalize(updated))
    }

    fn delete(&self, conn: &mut Connection, session: &Session, id: i64) -> EngineResult<()> {
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
        self.inner
            .transfer_to_goal(conn, session, account_id, goal_id, amount)
    }
}
