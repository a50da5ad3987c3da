// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Deleting a transaction, optionally replaying its inverse effect on the
//! account balance and budget consumption. Deletion and compensation are
//! one atomic unit; a refused reversal leaves the transaction in place.

use log::debug;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountStatus, FlowKind};
use crate::store;

pub fn delete_transaction(
    conn: &mut Connection,
    user_id: i64,
    transaction_id: i64,
    reverse_balances: bool,
) -> LedgerResult<()> {
    let dbtx = conn
        .transaction()
        .map_err(|e| LedgerError::infrastructure("begin delete", e))?;

    let existing = store::find_transaction_owned(&dbtx, user_id, transaction_id)?;
    if reverse_balances {
        let account = store::find_account(&dbtx, existing.account_id)?;
        if account.status == AccountStatus::Inactive {
            return Err(LedgerError::InvalidState(format!(
                "account '{}' is inactive; delete without reversal instead",
                account.name
            )));
        }
        match existing.kind {
            FlowKind::Income => {
                // Taking the deposit back may not drive the balance negative.
                if account.balance - existing.amount < Decimal::ZERO {
                    return Err(LedgerError::InsufficientFunds {
                        balance: account.balance,
                        requested: existing.amount,
                    });
                }
                store::apply_balance_delta(&dbtx, account.id, -existing.amount)?;
            }
            FlowKind::Expense => {
                store::apply_balance_delta(&dbtx, account.id, existing.amount)?;
                store::adjust_budget_spent(
                    &dbtx,
                    user_id,
                    existing.category_id,
                    existing.date,
                    -existing.amount,
                )?;
            }
        }
    }
    store::delete_transaction_row(&dbtx, transaction_id)?;
    dbtx.commit()
        .map_err(|e| LedgerError::infrastructure("commit delete", e))?;
    debug!(
        "deleted transaction {} for user {} (reversed: {})",
        transaction_id, user_id, reverse_balances
    );
    Ok(())
}
