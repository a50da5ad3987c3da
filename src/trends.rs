// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Time-bucketed report series. Every series is gap-free: buckets or days
//! with no transactions still appear with a zero or carried-forward value,
//! so the output plots directly.

use chrono::{Datelike, Duration, Months, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountBalanceSeries, BalancePoint, BudgetExecution, BudgetExecutionSummary, BudgetHealth,
    CategoryShare, FlowKind, TrendPoint,
};
use crate::reconstruct;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(Interval::Day),
            "week" => Some(Interval::Week),
            "month" => Some(Interval::Month),
            "year" => Some(Interval::Year),
            _ => None,
        }
    }

    /// Calendar-aligned floor: week to Monday, month to day 1, year to
    /// January 1.
    pub fn floor(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Interval::Day => date,
            Interval::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Interval::Month => date.with_day(1).unwrap_or(date),
            Interval::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// Start of the bucket after `floored`.
    pub fn next(&self, floored: NaiveDate) -> NaiveDate {
        match self {
            Interval::Day => floored + Duration::days(1),
            Interval::Week => floored + Duration::days(7),
            Interval::Month => floored + Months::new(1),
            Interval::Year => floored + Months::new(12),
        }
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> LedgerResult<()> {
    if start > end {
        return Err(LedgerError::InvalidInput(format!(
            "start {start} is after end {end}"
        )));
    }
    Ok(())
}

/// Income and expense sums per interval bucket over `[start, end]`,
/// covering every bucket from floor(start) to floor(end) inclusive.
pub fn income_expense_trend(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    interval: Interval,
) -> LedgerResult<Vec<TrendPoint>> {
    check_range(start, end)?;
    let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    let last = interval.floor(end);
    let mut cursor = interval.floor(start);
    loop {
        buckets.insert(cursor, (Decimal::ZERO, Decimal::ZERO));
        if cursor >= last {
            break;
        }
        cursor = interval.next(cursor);
    }

    for tx in store::transactions_in_range(conn, user_id, start, end)? {
        let bucket = interval.floor(tx.date);
        if let Some(entry) = buckets.get_mut(&bucket) {
            match tx.kind {
                FlowKind::Income => entry.0 += tx.amount,
                FlowKind::Expense => entry.1 += tx.amount,
            }
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(bucket, (income, expense))| TrendPoint {
            bucket,
            income,
            expense,
        })
        .collect())
}

/// One value per calendar day per account: seeded at `start` by backward
/// replay, then each day's deltas applied with the last value carried
/// forward through empty days.
pub fn account_balance_trend(
    conn: &Connection,
    user_id: i64,
    account_ids: Option<&[i64]>,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<AccountBalanceSeries>> {
    check_range(start, end)?;
    let accounts = match account_ids {
        Some(ids) => ids
            .iter()
            .map(|&id| store::find_account_owned(conn, user_id, id))
            .collect::<LedgerResult<Vec<_>>>()?,
        None => store::list_accounts(conn, user_id)?,
    };
    let history = store::transactions_for_user(conn, user_id)?;

    let mut series = Vec::with_capacity(accounts.len());
    for account in &accounts {
        // Deltas on the start date itself are already in the seed.
        let mut deltas: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for tx in &history {
            if tx.account_id == account.id && tx.date > start && tx.date <= end {
                *deltas.entry(tx.date).or_insert(Decimal::ZERO) += tx.signed_amount();
            }
        }
        let mut value = reconstruct::balance_at(account, start, &history);
        let mut points = Vec::new();
        let mut day = start;
        loop {
            if let Some(delta) = deltas.get(&day) {
                value += *delta;
            }
            points.push(BalancePoint {
                date: day,
                balance: value,
            });
            if day >= end {
                break;
            }
            day += Duration::days(1);
        }
        series.push(AccountBalanceSeries {
            account_id: account.id,
            account: account.name.clone(),
            points,
        });
    }
    Ok(series)
}

fn category_distribution(
    conn: &Connection,
    user_id: i64,
    kind: FlowKind,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryShare>> {
    check_range(start, end)?;
    let totals = match kind {
        FlowKind::Income => store::calculate_income_by_category(conn, user_id, start, end)?,
        FlowKind::Expense => store::calculate_expense_by_category(conn, user_id, start, end)?,
    };
    let grand_total: Decimal = totals.iter().map(|t| t.total).sum();
    if grand_total.is_zero() {
        return Ok(Vec::new());
    }
    Ok(totals
        .into_iter()
        .filter(|t| !t.total.is_zero())
        .map(|t| CategoryShare {
            category_id: t.category_id,
            category: t.category,
            amount: t.total,
            share: t.total / grand_total * Decimal::ONE_HUNDRED,
        })
        .collect())
}

pub fn expense_category_distribution(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryShare>> {
    category_distribution(conn, user_id, FlowKind::Expense, start, end)
}

pub fn income_category_distribution(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryShare>> {
    category_distribution(conn, user_id, FlowKind::Income, start, end)
}

/// Usage classification for every budget whose window overlaps
/// `[start, end]`, with per-class counts and grand totals.
pub fn budget_execution_statistics(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<BudgetExecutionSummary> {
    check_range(start, end)?;
    let near_limit_floor = Decimal::from(80);

    let mut executions = Vec::new();
    let mut total_budgeted = Decimal::ZERO;
    let mut total_spent = Decimal::ZERO;
    let (mut healthy, mut near_limit, mut over_budget) = (0usize, 0usize, 0usize);

    for budget in store::list_budgets(conn, user_id)? {
        if !budget.overlaps(start, end) {
            continue;
        }
        let spent: Decimal = store::budget_categories_for(conn, budget.id)?
            .iter()
            .map(|bc| bc.spent)
            .sum();
        let usage = if budget.total_amount.is_zero() {
            Decimal::ZERO
        } else {
            spent / budget.total_amount * Decimal::ONE_HUNDRED
        };
        let health = if usage > Decimal::ONE_HUNDRED {
            BudgetHealth::OverBudget
        } else if usage >= near_limit_floor {
            BudgetHealth::NearLimit
        } else {
            BudgetHealth::Healthy
        };
        match health {
            BudgetHealth::Healthy => healthy += 1,
            BudgetHealth::NearLimit => near_limit += 1,
            BudgetHealth::OverBudget => over_budget += 1,
        }
        total_budgeted += budget.total_amount;
        total_spent += spent;
        executions.push(BudgetExecution {
            budget_id: budget.id,
            name: budget.name,
            total_amount: budget.total_amount,
            spent,
            usage_percent: usage,
            health,
        });
    }

    Ok(BudgetExecutionSummary {
        budgets: executions,
        total_budgeted,
        total_spent,
        healthy,
        near_limit,
        over_budget,
    })
}
