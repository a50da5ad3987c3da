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
use tallybook::{db, recorder, store};

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
fn duplicate_names_are_conflicts() {
    let (conn, user) = setup();
    store::create_account(&conn, user, "Checking", dec("0")).unwrap();
    assert!(matches!(
        store::create_account(&conn, user, "Checking", dec("0")).unwrap_err(),
        LedgerError::Conflict(_)
    ));

    assert!(matches!(
        store::create_user(&conn, "alice").unwrap_err(),
        LedgerError::Conflict(_)
    ));

    store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    assert!(matches!(
        store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap_err(),
        LedgerError::Conflict(_)
    ));
    // Same name under the other kind is a different category.
    store::create_category(&conn, "Groceries", FlowKind::Income).unwrap();
}

#[test]
fn same_account_name_allowed_across_users() {
    let (conn, user) = setup();
    let bob = store::create_user(&conn, "bob").unwrap();
    store::create_account(&conn, user, "Checking", dec("0")).unwrap();
    store::create_account(&conn, bob.id, "Checking", dec("0")).unwrap();
}

#[test]
fn negative_opening_balance_rejected() {
    let (conn, user) = setup();
    assert!(matches!(
        store::create_account(&conn, user, "Checking", dec("-5")).unwrap_err(),
        LedgerError::InvalidInput(_)
    ));
}

fn seed_transactions(conn: &mut Connection, user: i64, count: u32) {
    let account = store::create_account(conn, user, "Checking", dec("0")).unwrap();
    let salary = store::create_category(conn, "Salary", FlowKind::Income).unwrap();
    for i in 0..count {
        let date = d("2025-01-01") + chrono::Duration::days(i64::from(i));
        recorder::record_income(
            conn,
            user,
            account.id,
            salary.id,
            dec("10"),
            Some(date),
            &format!("income {i}"),
        )
        .unwrap();
    }
}

#[test]
fn pagination_slices_newest_first() {
    let (mut conn, user) = setup();
    seed_transactions(&mut conn, user, 25);

    let page = store::get_transactions_with_pagination(&conn, user, 2, 10).unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.transactions.len(), 10);
    // Newest first: page 2 starts at the 11th most recent (2025-01-15).
    assert_eq!(page.transactions[0].date, d("2025-01-15"));

    let last = store::get_transactions_with_pagination(&conn, user, 3, 10).unwrap();
    assert_eq!(last.transactions.len(), 5);
}

#[test]
fn pagination_rejects_bad_page_numbers() {
    let (conn, user) = setup();
    assert!(matches!(
        store::get_transactions_with_pagination(&conn, user, 0, 10).unwrap_err(),
        LedgerError::InvalidInput(_)
    ));
    assert!(matches!(
        store::get_transactions_with_pagination(&conn, user, 1, 0).unwrap_err(),
        LedgerError::InvalidInput(_)
    ));
}

#[test]
fn recent_respects_limit_and_order() {
    let (mut conn, user) = setup();
    seed_transactions(&mut conn, user, 5);

    let recent = store::get_recent_transactions(&conn, user, 3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].date, d("2025-01-05"));
    assert_eq!(recent[2].date, d("2025-01-03"));
}

#[test]
fn totals_cover_only_the_requested_range() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("1000")).unwrap();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    recorder::record_income(&mut conn, user, account.id, salary.id, dec("100"), Some(d("2025-01-10")), "")
        .unwrap();
    recorder::record_income(&mut conn, user, account.id, salary.id, dec("30"), Some(d("2025-02-10")), "")
        .unwrap();
    recorder::record_expense(&mut conn, user, account.id, groceries.id, dec("45"), Some(d("2025-01-20")), "")
        .unwrap();

    assert_eq!(
        store::calculate_total_income(&conn, user, d("2025-01-01"), d("2025-01-31")).unwrap(),
        dec("100")
    );
    assert_eq!(
        store::calculate_total_expense(&conn, user, d("2025-01-01"), d("2025-01-31")).unwrap(),
        dec("45")
    );
    assert_eq!(
        store::calculate_total_income(&conn, user, d("2025-01-01"), d("2025-02-28")).unwrap(),
        dec("130")
    );
}

#[test]
fn by_category_totals_are_grouped_and_sorted() {
    let (mut conn, user) = setup();
    let account = store::create_account(&conn, user, "Checking", dec("1000")).unwrap();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    let transport = store::create_category(&conn, "Transport", FlowKind::Expense).unwrap();
    recorder::record_expense(&mut conn, user, account.id, groceries.id, dec("30"), Some(d("2025-01-10")), "")
        .unwrap();
    recorder::record_expense(&mut conn, user, account.id, groceries.id, dec("25"), Some(d("2025-01-12")), "")
        .unwrap();
    recorder::record_expense(&mut conn, user, account.id, transport.id, dec("40"), Some(d("2025-01-14")), "")
        .unwrap();

    let totals =
        store::calculate_expense_by_category(&conn, user, d("2025-01-01"), d("2025-01-31"))
            .unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].category, "Groceries");
    assert_eq!(totals[0].total, dec("55"));
    assert_eq!(totals[1].category, "Transport");
    assert_eq!(totals[1].total, dec("40"));
}

#[test]
fn allocation_sum_may_not_exceed_budget_total() {
    let (conn, user) = setup();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    let transport = store::create_category(&conn, "Transport", FlowKind::Expense).unwrap();
    let budget = store::create_budget(
        &conn,
        user,
        "January",
        d("2025-01-01"),
        BudgetPeriod::Monthly,
        dec("500"),
    )
    .unwrap();

    store::allocate_budget_category(&conn, user, budget.id, groceries.id, dec("300")).unwrap();
    let err = store::allocate_budget_category(&conn, user, budget.id, transport.id, dec("250"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Exactly filling the total is fine.
    store::allocate_budget_category(&conn, user, budget.id, transport.id, dec("200")).unwrap();
}

#[test]
fn reallocation_replaces_the_old_amount() {
    let (conn, user) = setup();
    let groceries = store::create_category(&conn, "Groceries", FlowKind::Expense).unwrap();
    let budget = store::create_budget(
        &conn,
        user,
        "January",
        d("2025-01-01"),
        BudgetPeriod::Monthly,
        dec("500"),
    )
    .unwrap();

    store::allocate_budget_category(&conn, user, budget.id, groceries.id, dec("300")).unwrap();
    // 450 only fits because the prior 300 is replaced, not added.
    store::allocate_budget_category(&conn, user, budget.id, groceries.id, dec("450")).unwrap();

    let allocations = store::budget_categories_for(&conn, budget.id).unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].allocated, dec("450"));
}

#[test]
fn income_categories_cannot_be_allocated() {
    let (conn, user) = setup();
    let salary = store::create_category(&conn, "Salary", FlowKind::Income).unwrap();
    let budget = store::create_budget(
        &conn,
        user,
        "January",
        d("2025-01-01"),
        BudgetPeriod::Monthly,
        dec("500"),
    )
    .unwrap();

    let err =
        store::allocate_budget_category(&conn, user, budget.id, salary.id, dec("100")).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}

#[test]
fn foreign_budget_rejected_with_ownership() {
    let (conn, user) = setup();
    let bob = store::create_user(&conn, "bob").unwrap();
    let budget = store::create_budget(
        &conn,
        bob.id,
        "Bob January",
        d("2025-01-01"),
        BudgetPeriod::Monthly,
        dec("500"),
    )
    .unwrap();

    assert!(matches!(
        store::find_budget_owned(&conn, user, budget.id).unwrap_err(),
        LedgerError::Ownership { .. }
    ));
}

#[test]
fn budget_windows_follow_period_type() {
    let (conn, user) = setup();
    let weekly = store::create_budget(
        &conn,
        user,
        "Week",
        d("2025-01-06"),
        BudgetPeriod::Weekly,
        dec("100"),
    )
    .unwrap();
    assert_eq!(weekly.window_end(), d("2025-01-13"));
    assert!(weekly.covers(d("2025-01-12")));
    assert!(!weekly.covers(d("2025-01-13")));

    let yearly = store::create_budget(
        &conn,
        user,
        "Year",
        d("2025-03-01"),
        BudgetPeriod::Yearly,
        dec("100"),
    )
    .unwrap();
    assert_eq!(yearly.window_end(), d("2026-03-01"));
}
