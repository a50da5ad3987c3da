// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;

/// Domain error taxonomy for the ledger core. Callers match on the kind;
/// only `Infrastructure` carries low-level storage text.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} does not belong to user {user_id}")]
    Ownership {
        entity: &'static str,
        id: i64,
        user_id: i64,
    },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure during {op}: {message}")]
    Infrastructure { op: &'static str, message: String },
}

impl LedgerError {
    pub fn infrastructure(op: &'static str, err: rusqlite::Error) -> Self {
        LedgerError::Infrastructure {
            op,
            message: err.to_string(),
        }
    }

    /// A stored value (balance, amount, enum tag) failed to parse back.
    pub fn corrupt(op: &'static str, value: &str) -> Self {
        LedgerError::Infrastructure {
            op,
            message: format!("invalid stored value '{value}'"),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::infrastructure("storage", err)
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
