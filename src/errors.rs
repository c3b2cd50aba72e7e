// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failures surfaced by the transaction engine and the recurrence
/// scheduler. Everything is returned synchronously to the caller; the only
/// swallowed path is the currency guard's fallback-rate diagnostic.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("insufficient funds: balance {balance} is short of {required}")]
    InsufficientFunds {
        balance: rust_decimal::Decimal,
        required: rust_decimal::Decimal,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
