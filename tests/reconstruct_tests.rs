// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;

use tallybook::models::FlowKind;
use tallybook::{db, reconstruct, recorder, store};

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
fn balance_at_today_equals_current_balance() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("100")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("40"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();

    let account = store::find_account(&conn, account.id).unwrap();
    let history = store::transactions_for_user(&conn, user).unwrap();
    let today = Local::now().date_naive();
    assert_eq!(
        reconstruct::balance_at(&account, today, &history),
        account.balance
    );
}

#[test]
fn balance_before_first_transaction_is_opening_balance() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("100")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("40"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    recorder::record_expense(
        &mut conn,
        user,
        account.id,
        groceries.id,
        dec("25"),
        Some(d("2025-01-20")),
        "",
    )
    .unwrap();

    let account = store::find_account(&conn, account.id).unwrap();
    let history = store::transactions_for_user(&conn, user).unwrap();
    assert_eq!(
        reconstruct::balance_at(&account, d("2025-01-09"), &history),
        dec("100")
    );
}

#[test]
fn backward_replay_unwinds_only_later_transactions() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("0")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("200"),
        Some(d("2025-01-05")),
        "",
    )
    .unwrap();
    recorder::record_expense(
        &mut conn,
        user,
        account.id,
        groceries.id,
        dec("50"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    recorder::record_income(
        &mut conn,
        user,
        account.id,
        salary.id,
        dec("30"),
        Some(d("2025-01-20")),
        "",
    )
    .unwrap();

    let account = store::find_account(&conn, account.id).unwrap();
    assert_eq!(account.balance, dec("180"));
    let history = store::transactions_for_user(&conn, user).unwrap();

    // On the 10th the later 30 income has not happened yet.
    assert_eq!(
        reconstruct::balance_at(&account, d("2025-01-10"), &history),
        dec("150")
    );
    // On the 7th only the opening 200 income is in.
    assert_eq!(
        reconstruct::balance_at(&account, d("2025-01-07"), &history),
        dec("200")
    );
}

#[test]
fn other_accounts_transactions_are_ignored() {
    let (mut conn, user) = setup();
    let checking = store::create_account(&conn, user, "Checking", dec("0")).unwrap();
    let savings = store::create_account(&conn, user, "Savings", dec("0")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        checking.id,
        salary.id,
        dec("100"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    recorder::record_income(
        &mut conn,
        user,
        savings.id,
        salary.id,
        dec("70"),
        Some(d("2025-01-15")),
        "",
    )
    .unwrap();

    let checking = store::find_account(&conn, checking.id).unwrap();
    let history = store::transactions_for_user(&conn, user).unwrap();
    assert_eq!(
        reconstruct::balance_at(&checking, d("2025-01-01"), &history),
        Decimal::ZERO
    );
}

#[test]
fn net_worth_sums_all_accounts_at_date() {
    let (mut conn, user) = setup();
    let checking = store::create_account(&conn, user, "Checking", dec("100")).unwrap();
    let savings = store::create_account(&conn, user, "Savings", dec("400")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    recorder::record_income(
        &mut conn,
        user,
        checking.id,
        salary.id,
        dec("100"),
        Some(d("2025-01-10")),
        "",
    )
    .unwrap();
    recorder::record_income(
        &mut conn,
        user,
        savings.id,
        salary.id,
        dec("50"),
        Some(d("2025-01-20")),
        "",
    )
    .unwrap();

    let accounts = store::list_accounts(&conn, user).unwrap();
    let history = store::transactions_for_user(&conn, user).unwrap();

    // Before either income: opening balances only.
    assert_eq!(
        reconstruct::net_worth_at(&accounts, d("2025-01-01"), &history),
        dec("500")
    );
    // Between the two incomes.
    assert_eq!(
        reconstruct::net_worth_at(&accounts, d("2025-01-15"), &history),
        dec("600")
    );
    // After both.
    assert_eq!(
        reconstruct::net_worth_at(&accounts, d("2025-01-31"), &history),
        dec("650")
    );
}
