// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The transaction recorder: every financial event enters the ledger
//! here, and every derived value it touches (account balance, budget
//! consumption) is updated in the same SQLite transaction. An early
//! return drops the transaction guard, which rolls everything back, so
//! a failure partway through leaves no partial effect behind.

use chrono::{Local, NaiveDate};
use log::debug;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountStatus, FlowKind, Transaction};
use crate::store;

pub const TRANSFER_OUT_CATEGORY: &str = "Transfer out";
pub const TRANSFER_IN_CATEGORY: &str = "Transfer in";

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn record_income(
    conn: &mut Connection,
    user_id: i64,
    account_id: i64,
    category_id: i64,
    amount: Decimal,
    date: Option<NaiveDate>,
    description: &str,
) -> LedgerResult<Transaction> {
    record(
        conn,
        user_id,
        FlowKind::Income,
        account_id,
        category_id,
        amount,
        date,
        description,
    )
}

pub fn record_expense(
    conn: &mut Connection,
    user_id: i64,
    account_id: i64,
    category_id: i64,
    amount: Decimal,
    date: Option<NaiveDate>,
    description: &str,
) -> LedgerResult<Transaction> {
    record(
        conn,
        user_id,
        FlowKind::Expense,
        account_id,
        category_id,
        amount,
        date,
        description,
    )
}

/// Preconditions are checked in a fixed order before any write: account
/// exists and is owned, account active, category exists and kind-matches,
/// amount positive, date not in the future, and (expense only) sufficient
/// balance.
#[allow(clippy::too_many_arguments)]
fn record(
    conn: &mut Connection,
    user_id: i64,
    kind: FlowKind,
    account_id: i64,
    category_id: i64,
    amount: Decimal,
    date: Option<NaiveDate>,
    description: &str,
) -> LedgerResult<Transaction> {
    let dbtx = conn
        .transaction()
        .map_err(|e| LedgerError::infrastructure("begin record", e))?;

    let account = store::find_account_owned(&dbtx, user_id, account_id)?;
    require_active(&account)?;
    let category = store::find_category(&dbtx, category_id)?;
    if category.kind != kind {
        return Err(LedgerError::InvalidInput(format!(
            "category '{}' is {}, expected {}",
            category.name,
            category.kind.as_str(),
            kind.as_str()
        )));
    }
    validate_amount(amount)?;
    let date = validated_date(date)?;
    if kind == FlowKind::Expense && account.balance < amount {
        return Err(LedgerError::InsufficientFunds {
            balance: account.balance,
            requested: amount,
        });
    }

    let id = store::insert_transaction(
        &dbtx,
        &store::NewTransaction {
            user_id,
            kind,
            amount,
            date,
            description,
            category_id,
            account_id,
        },
    )?;
    let delta = match kind {
        FlowKind::Income => amount,
        FlowKind::Expense => -amount,
    };
    store::apply_balance_delta(&dbtx, account_id, delta)?;
    if kind == FlowKind::Expense {
        store::adjust_budget_spent(&dbtx, user_id, category_id, date, amount)?;
    }

    dbtx.commit()
        .map_err(|e| LedgerError::infrastructure("commit record", e))?;
    debug!(
        "recorded {} {} on account {} for user {} ({})",
        kind.as_str(),
        amount,
        account_id,
        user_id,
        date
    );
    Ok(Transaction {
        id,
        user_id,
        kind,
        amount,
        date,
        description: description.to_string(),
        category_id,
        account_id,
    })
}

/// Editable fields of a recorded transaction. Kind is immutable; passing
/// a different kind is rejected.
#[derive(Debug, Default, Clone)]
pub struct TransactionUpdate {
    pub kind: Option<FlowKind>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

/// Applies an edit and recomputes the derived state it invalidates: the
/// old effect is reversed and the new one applied in the same atomic
/// unit, so balance and budget consumption stay a function of history.
pub fn update_transaction(
    conn: &mut Connection,
    user_id: i64,
    transaction_id: i64,
    update: &TransactionUpdate,
) -> LedgerResult<Transaction> {
    let dbtx = conn
        .transaction()
        .map_err(|e| LedgerError::infrastructure("begin update", e))?;

    let existing = store::find_transaction_owned(&dbtx, user_id, transaction_id)?;
    if let Some(kind) = update.kind {
        if kind != existing.kind {
            return Err(LedgerError::InvalidInput(
                "transaction kind is immutable; delete and re-record instead".to_string(),
            ));
        }
    }
    let category = match update.category_id {
        Some(id) => store::find_category(&dbtx, id)?,
        None => store::find_category(&dbtx, existing.category_id)?,
    };
    if category.kind != existing.kind {
        return Err(LedgerError::InvalidInput(format!(
            "category '{}' is {}, expected {}",
            category.name,
            category.kind.as_str(),
            existing.kind.as_str()
        )));
    }
    let new_amount = update.amount.unwrap_or(existing.amount);
    validate_amount(new_amount)?;
    let new_date = validated_date(Some(update.date.unwrap_or(existing.date)))?;

    let account = store::find_account(&dbtx, existing.account_id)?;
    require_active(&account)?;
    match existing.kind {
        FlowKind::Income => {
            // Net effect of undoing the old deposit and applying the new one.
            let new_balance = account.balance - existing.amount + new_amount;
            if new_balance < Decimal::ZERO {
                return Err(LedgerError::InsufficientFunds {
                    balance: account.balance,
                    requested: existing.amount - new_amount,
                });
            }
            store::apply_balance_delta(&dbtx, account.id, new_amount - existing.amount)?;
        }
        FlowKind::Expense => {
            let refunded = account.balance + existing.amount;
            if refunded < new_amount {
                return Err(LedgerError::InsufficientFunds {
                    balance: refunded,
                    requested: new_amount,
                });
            }
            store::apply_balance_delta(&dbtx, account.id, existing.amount - new_amount)?;
            store::adjust_budget_spent(
                &dbtx,
                user_id,
                existing.category_id,
                existing.date,
                -existing.amount,
            )?;
            store::adjust_budget_spent(&dbtx, user_id, category.id, new_date, new_amount)?;
        }
    }

    let updated = Transaction {
        amount: new_amount,
        date: new_date,
        description: update
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone()),
        category_id: category.id,
        ..existing
    };
    store::update_transaction_row(&dbtx, &updated)?;
    dbtx.commit()
        .map_err(|e| LedgerError::infrastructure("commit update", e))?;
    debug!(
        "updated transaction {} for user {} (amount {})",
        transaction_id, user_id, new_amount
    );
    Ok(updated)
}

/// Bookkeeping-only closure transfer: the remaining balance moves to
/// `transfer_to` as a paired expense/income against the system transfer
/// categories, then the account goes inactive. One atomic unit.
pub fn close_account(
    conn: &mut Connection,
    user_id: i64,
    account_id: i64,
    transfer_to: i64,
) -> LedgerResult<()> {
    if account_id == transfer_to {
        return Err(LedgerError::InvalidInput(
            "cannot close an account into itself".to_string(),
        ));
    }
    let dbtx = conn
        .transaction()
        .map_err(|e| LedgerError::infrastructure("begin close", e))?;

    let account = store::find_account_owned(&dbtx, user_id, account_id)?;
    require_active(&account)?;
    let target = store::find_account_owned(&dbtx, user_id, transfer_to)?;
    require_active(&target)?;

    let balance = account.balance;
    if balance > Decimal::ZERO {
        let out_cat =
            store::find_or_create_category(&dbtx, TRANSFER_OUT_CATEGORY, FlowKind::Expense)?;
        let in_cat =
            store::find_or_create_category(&dbtx, TRANSFER_IN_CATEGORY, FlowKind::Income)?;
        let date = today();
        store::insert_transaction(
            &dbtx,
            &store::NewTransaction {
                user_id,
                kind: FlowKind::Expense,
                amount: balance,
                date,
                description: &format!("Closure transfer to '{}'", target.name),
                category_id: out_cat.id,
                account_id,
            },
        )?;
        store::apply_balance_delta(&dbtx, account_id, -balance)?;
        store::adjust_budget_spent(&dbtx, user_id, out_cat.id, date, balance)?;
        store::insert_transaction(
            &dbtx,
            &store::NewTransaction {
                user_id,
                kind: FlowKind::Income,
                amount: balance,
                date,
                description: &format!("Closure transfer from '{}'", account.name),
                category_id: in_cat.id,
                account_id: transfer_to,
            },
        )?;
        store::apply_balance_delta(&dbtx, transfer_to, balance)?;
    }
    store::set_account_status(&dbtx, account_id, AccountStatus::Inactive)?;
    dbtx.commit()
        .map_err(|e| LedgerError::infrastructure("commit close", e))?;
    debug!(
        "closed account {} for user {}, transferred {} to account {}",
        account_id, user_id, balance, transfer_to
    );
    Ok(())
}

/// Marks an account inactive without a transfer. Only a zero-balance
/// account may go inactive.
pub fn deactivate_account(
    conn: &mut Connection,
    user_id: i64,
    account_id: i64,
) -> LedgerResult<()> {
    let dbtx = conn
        .transaction()
        .map_err(|e| LedgerError::infrastructure("begin deactivate", e))?;
    let account = store::find_account_owned(&dbtx, user_id, account_id)?;
    require_active(&account)?;
    if !account.balance.is_zero() {
        return Err(LedgerError::InvalidState(format!(
            "account '{}' still holds {}; close it with a transfer instead",
            account.name, account.balance
        )));
    }
    store::set_account_status(&dbtx, account_id, AccountStatus::Inactive)?;
    dbtx.commit()
        .map_err(|e| LedgerError::infrastructure("commit deactivate", e))?;
    Ok(())
}

fn require_active(account: &Account) -> LedgerResult<()> {
    if account.status != AccountStatus::Active {
        return Err(LedgerError::InvalidState(format!(
            "account '{}' is inactive",
            account.name
        )));
    }
    Ok(())
}

fn validate_amount(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn validated_date(date: Option<NaiveDate>) -> LedgerResult<NaiveDate> {
    let date = date.unwrap_or_else(today);
    if date > today() {
        return Err(LedgerError::InvalidInput(format!(
            "transaction date {date} is in the future"
        )));
    }
    Ok(date)
}
