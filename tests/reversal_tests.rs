// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use tallybook::error::LedgerError;
use tallybook::models::{BudgetPeriod, FlowKind};
use tallybook::{db, recorder, reversal, store};

fn setup() -> (Connection, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    let user = store::create_user(&conn, "alice").unwrap();
    (conn, user.id)
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn income_reversal_round_trip_restores_balance() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("100")).unwrap();
    let cat = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let tx = recorder::record_income(
        &mut conn,
        user,
        account.id,
        cat.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();

    reversal::delete_transaction(&mut conn, user, tx.id, true).unwrap();

    assert_eq!(
        store::find_account(&conn, account.id).unwrap().balance,
        dec("100")
    );
    assert!(matches!(
        store::find_transaction(&conn, tx.id).unwrap_err(),
        LedgerError::NotFound { .. }
    ));
}

#[test]
fn expense_reversal_restores_balance_and_budget_spent() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("500")).unwrap();
    let cat = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    let budget = store::create_budget(
        &conn,
        user,
        "January",
        d("2025-01-01"),
        BudgetPeriod::Monthly,
        dec("1000"),
    )
    .unwrap();
    store::allocate_budget_category(&conn, user, budget.id, cat.id, dec("400")).unwrap();
    let tx = recorder::record_expense(
        &mut conn,
        user,
        account.id,
        cat.id,
        dec("120"),
        Some(d("2025-01-15")),
        "",
    )
    .unwrap();

    reversal::delete_transaction(&mut conn, user, tx.id, true).unwrap();

    assert_eq!(
        store::find_account(&conn, account.id).unwrap().balance,
        dec("500")
    );
    let allocations = store::budget_categories_for(&conn, budget.id).unwrap();
    assert_eq!(allocations[0].spent, Decimal::ZERO);
}

#[test]
fn income_reversal_refused_when_balance_would_go_negative() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("0")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    let income = recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    recorder::record_expense(
        &mut conn,
        user,
        account.id,
        groceries.id,
        dec("30"),
        Some(d("2025-01-12")),
        "",
    )
    .unwrap();

    // Balance is 20; unwinding the 50 income would leave -30.
    let err = reversal::delete_transaction(&mut conn, user, income.id, true).unwrap_err();
    match err {
        LedgerError::InsufficientFunds { balance, requested } => {
            assert_eq!(balance, dec("20"));
            assert_eq!(requested, dec("50"));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    // Refused, not partially applied: the row is still there.
    assert!(store::find_transaction(&conn, income.id).is_ok());
    assert_eq!(
        store::find_account(&conn, account.id).unwrap().balance,
        dec("20")
    );
}

#[test]
fn delete_without_reversal_keeps_balances() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("100")).unwrap();
    let cat = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let tx = recorder::record_income(
        &mut conn,
        user,
        account.id,
        cat.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();

    reversal::delete_transaction(&mut conn, user, tx.id, false).unwrap();

    assert_eq!(
        store::find_account(&conn, account.id).unwrap().balance,
        dec("150")
    );
    assert!(matches!(
        store::find_transaction(&conn, tx.id).unwrap_err(),
        LedgerError::NotFound { .. }
    ));
}

#[test]
fn delete_unknown_transaction_is_not_found() {
    let (mut conn, user) = setup();
    let err = reversal::delete_transaction(&mut conn, user, 42, true).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "transaction",
            ..
        }
    ));
}

#[test]
fn foreign_transaction_rejected_with_ownership() {
    let (mut conn, user) = setup();
    let bob = store::create_user(&conn, "bob").unwrap();
    let account = store::create_account(&conn, bob.id, "Bob checking", dec("0")).unwrap();
    let cat = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let tx = recorder::record_income(
        &mut conn,
        bob.id,
        account.id,
        cat.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();

    let err = reversal::delete_transaction(&mut conn, user, tx.id, true).unwrap_err();
    assert!(matches!(err, LedgerError::Ownership { .. }));
}

#[test]
fn reversal_into_inactive_account_refused() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Old", dec("0")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    let expense = recorder::record_expense(
        &mut conn,
        user,
        account.id,
        groceries.id,
        dec("50"),
        Some(d("2025-01-12")),
        "",
    )
    .unwrap();
    recorder::deactivate_account(&mut conn, user, account.id).unwrap();

    let err = reversal::delete_transaction(&mut conn, user, expense.id, true).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    // Deleting without reversal still works on a closed account.
    reversal::delete_transaction(&mut conn, user, expense.id, false).unwrap();
}
