// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Point-in-time balances by backward replay: the current balance is
//! authoritative, and every transaction dated strictly after the target
//! date gets its effect undone. Transactions on or before the date are
//! already baked into the current balance. Pure functions over slices;
//! only disjoint additions and subtractions, so iteration order does not
//! matter.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Account, FlowKind, Transaction};

pub fn balance_at(account: &Account, as_of: NaiveDate, transactions: &[Transaction]) -> Decimal {
    let mut balance = account.balance;
    for tx in transactions {
        if tx.account_id != account.id || tx.date <= as_of {
            continue;
        }
        match tx.kind {
            FlowKind::Income => balance -= tx.amount,
            FlowKind::Expense => balance += tx.amount,
        }
    }
    balance
}

pub fn net_worth_at(
    accounts: &[Account],
    as_of: NaiveDate,
    transactions: &[Transaction],
) -> Decimal {
    accounts
        .iter()
        .map(|account| balance_at(account, as_of, transactions))
        .sum()
}
