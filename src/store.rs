// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row-level access to the ledger store. Everything here takes a
//! `&Connection`, so the same helpers run standalone or inside an
//! enclosing `rusqlite::Transaction` (which derefs to `Connection`).
//! Amounts are stored as TEXT decimal strings and parsed to `Decimal`
//! on the way out; derived columns (account balance, budget spent) are
//! only written through the delta helpers at the bottom.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountStatus, Budget, BudgetCategory, BudgetPeriod, Category, CategoryTotal,
    FlowKind, Transaction, TransactionPage, User,
};

fn stored_decimal(s: &str, op: &'static str) -> LedgerResult<Decimal> {
    s.parse::<Decimal>().map_err(|_| LedgerError::corrupt(op, s))
}

fn stored_date(s: &str, op: &'static str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| LedgerError::corrupt(op, s))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// --- users ---

pub fn create_user(conn: &Connection, name: &str) -> LedgerResult<User> {
    conn.execute("INSERT INTO users(name) VALUES (?1)", params![name])
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::Conflict(format!("user '{name}' already exists"))
            } else {
                LedgerError::infrastructure("create user", e)
            }
        })?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn find_user_by_name(conn: &Connection, name: &str) -> LedgerResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, name FROM users WHERE name=?1",
            params![name],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(|e| LedgerError::infrastructure("find user", e))?;
    Ok(row.map(|(id, name)| User { id, name }))
}

pub fn list_users(conn: &Connection) -> LedgerResult<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name FROM users ORDER BY name")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
    let mut users = Vec::new();
    for row in rows {
        let (id, name) = row?;
        users.push(User { id, name });
    }
    Ok(users)
}

// --- accounts ---

fn account_from_parts(
    id: i64,
    user_id: i64,
    name: String,
    balance: String,
    status: String,
) -> LedgerResult<Account> {
    Ok(Account {
        id,
        user_id,
        name,
        balance: stored_decimal(&balance, "read account balance")?,
        status: AccountStatus::parse(&status)
            .ok_or_else(|| LedgerError::corrupt("read account status", &status))?,
    })
}

pub fn create_account(
    conn: &Connection,
    user_id: i64,
    name: &str,
    opening_balance: Decimal,
) -> LedgerResult<Account> {
    if opening_balance < Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "opening balance must not be negative, got {opening_balance}"
        )));
    }
    conn.execute(
        "INSERT INTO accounts(user_id, name, balance) VALUES (?1, ?2, ?3)",
        params![user_id, name, opening_balance.to_string()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::Conflict(format!("account '{name}' already exists for this user"))
        } else {
            LedgerError::infrastructure("create account", e)
        }
    })?;
    Ok(Account {
        id: conn.last_insert_rowid(),
        user_id,
        name: name.to_string(),
        balance: opening_balance,
        status: AccountStatus::Active,
    })
}

pub fn find_account(conn: &Connection, id: i64) -> LedgerResult<Account> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, balance, status FROM accounts WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| LedgerError::infrastructure("find account", e))?;
    let (id, user_id, name, balance, status) = row.ok_or(LedgerError::NotFound {
        entity: "account",
        id,
    })?;
    account_from_parts(id, user_id, name, balance, status)
}

/// `find_account` plus the ownership check every core call performs.
pub fn find_account_owned(conn: &Connection, user_id: i64, id: i64) -> LedgerResult<Account> {
    let account = find_account(conn, id)?;
    if account.user_id != user_id {
        return Err(LedgerError::Ownership {
            entity: "account",
            id,
            user_id,
        });
    }
    Ok(account)
}

pub fn list_accounts(conn: &Connection, user_id: i64) -> LedgerResult<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, balance, status FROM accounts WHERE user_id=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    let mut accounts = Vec::new();
    for row in rows {
        let (id, user_id, name, balance, status) = row?;
        accounts.push(account_from_parts(id, user_id, name, balance, status)?);
    }
    Ok(accounts)
}

pub fn set_account_status(
    conn: &Connection,
    account_id: i64,
    status: AccountStatus,
) -> LedgerResult<()> {
    conn.execute(
        "UPDATE accounts SET status=?1 WHERE id=?2",
        params![status.as_str(), account_id],
    )
    .map_err(|e| LedgerError::infrastructure("set account status", e))?;
    Ok(())
}

/// Read-modify-write of the TEXT balance column. Returns the new balance.
/// Must run inside the caller's transaction when paired with other writes.
pub fn apply_balance_delta(
    conn: &Connection,
    account_id: i64,
    delta: Decimal,
) -> LedgerResult<Decimal> {
    let account = find_account(conn, account_id)?;
    let new_balance = account.balance + delta;
    conn.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2",
        params![new_balance.to_string(), account_id],
    )
    .map_err(|e| LedgerError::infrastructure("update account balance", e))?;
    Ok(new_balance)
}

// --- categories ---

pub fn create_category(conn: &Connection, name: &str, kind: FlowKind) -> LedgerResult<Category> {
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES (?1, ?2)",
        params![name, kind.as_str()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::Conflict(format!(
                "{} category '{name}' already exists",
                kind.as_str()
            ))
        } else {
            LedgerError::infrastructure("create category", e)
        }
    })?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        kind,
    })
}

pub fn find_category(conn: &Connection, id: i64) -> LedgerResult<Category> {
    let row = conn
        .query_row(
            "SELECT id, name, kind FROM categories WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(|e| LedgerError::infrastructure("find category", e))?;
    let (id, name, kind) = row.ok_or(LedgerError::NotFound {
        entity: "category",
        id,
    })?;
    Ok(Category {
        id,
        name,
        kind: FlowKind::parse(&kind)
            .ok_or_else(|| LedgerError::corrupt("read category kind", &kind))?,
    })
}

pub fn find_or_create_category(
    conn: &Connection,
    name: &str,
    kind: FlowKind,
) -> LedgerResult<Category> {
    let existing = conn
        .query_row(
            "SELECT id FROM categories WHERE name=?1 AND kind=?2",
            params![name, kind.as_str()],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| LedgerError::infrastructure("find category", e))?;
    if let Some(id) = existing {
        return Ok(Category {
            id,
            name: name.to_string(),
            kind,
        });
    }
    create_category(conn, name, kind)
}

pub fn list_categories(conn: &Connection, kind: Option<FlowKind>) -> LedgerResult<Vec<Category>> {
    let mut categories = Vec::new();
    let mut push = |id: i64, name: String, kind_s: String| -> LedgerResult<()> {
        categories.push(Category {
            id,
            name,
            kind: FlowKind::parse(&kind_s)
                .ok_or_else(|| LedgerError::corrupt("read category kind", &kind_s))?,
        });
        Ok(())
    };
    match kind {
        Some(k) => {
            let mut stmt = conn
                .prepare("SELECT id, name, kind FROM categories WHERE kind=?1 ORDER BY name")?;
            let rows = stmt.query_map(params![k.as_str()], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (id, name, kind_s) = row?;
                push(id, name, kind_s)?;
            }
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT id, name, kind FROM categories ORDER BY kind, name")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (id, name, kind_s) = row?;
                push(id, name, kind_s)?;
            }
        }
    }
    Ok(categories)
}

// --- transactions ---

type TxRow = (i64, i64, String, String, String, String, i64, i64);

fn tx_select(where_clause: &str) -> String {
    format!(
        "SELECT id, user_id, kind, amount, date, description, category_id, account_id \
         FROM transactions {where_clause}"
    )
}

fn map_tx_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<TxRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
    ))
}

fn tx_from_row(row: TxRow) -> LedgerResult<Transaction> {
    let (id, user_id, kind, amount, date, description, category_id, account_id) = row;
    Ok(Transaction {
        id,
        user_id,
        kind: FlowKind::parse(&kind)
            .ok_or_else(|| LedgerError::corrupt("read transaction kind", &kind))?,
        amount: stored_decimal(&amount, "read transaction amount")?,
        date: stored_date(&date, "read transaction date")?,
        description,
        category_id,
        account_id,
    })
}

pub struct NewTransaction<'a> {
    pub user_id: i64,
    pub kind: FlowKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: &'a str,
    pub category_id: i64,
    pub account_id: i64,
}

pub fn insert_transaction(conn: &Connection, new: &NewTransaction<'_>) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO transactions(user_id, kind, amount, date, description, category_id, account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.user_id,
            new.kind.as_str(),
            new.amount.to_string(),
            new.date.to_string(),
            new.description,
            new.category_id,
            new.account_id
        ],
    )
    .map_err(|e| LedgerError::infrastructure("insert transaction", e))?;
    Ok(conn.last_insert_rowid())
}

pub fn find_transaction(conn: &Connection, id: i64) -> LedgerResult<Transaction> {
    let row = conn
        .query_row(&tx_select("WHERE id=?1"), params![id], map_tx_row)
        .optional()
        .map_err(|e| LedgerError::infrastructure("find transaction", e))?;
    let row = row.ok_or(LedgerError::NotFound {
        entity: "transaction",
        id,
    })?;
    tx_from_row(row)
}

pub fn find_transaction_owned(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> LedgerResult<Transaction> {
    let tx = find_transaction(conn, id)?;
    if tx.user_id != user_id {
        return Err(LedgerError::Ownership {
            entity: "transaction",
            id,
            user_id,
        });
    }
    Ok(tx)
}

pub fn update_transaction_row(conn: &Connection, tx: &Transaction) -> LedgerResult<()> {
    conn.execute(
        "UPDATE transactions SET amount=?1, date=?2, description=?3, category_id=?4 WHERE id=?5",
        params![
            tx.amount.to_string(),
            tx.date.to_string(),
            tx.description,
            tx.category_id,
            tx.id
        ],
    )
    .map_err(|e| LedgerError::infrastructure("update transaction", e))?;
    Ok(())
}

pub fn delete_transaction_row(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM transactions WHERE id=?1", params![id])
        .map_err(|e| LedgerError::infrastructure("delete transaction", e))?;
    Ok(())
}

fn collect_transactions(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> LedgerResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, map_tx_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(tx_from_row(row?)?);
    }
    Ok(out)
}

/// Full history for one user, the reconstruction input.
pub fn transactions_for_user(conn: &Connection, user_id: i64) -> LedgerResult<Vec<Transaction>> {
    collect_transactions(
        conn,
        &tx_select("WHERE user_id=?1 ORDER BY date, id"),
        &[&user_id as &dyn rusqlite::ToSql],
    )
}

pub fn transactions_in_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<Transaction>> {
    collect_transactions(
        conn,
        &tx_select("WHERE user_id=?1 AND date>=?2 AND date<=?3 ORDER BY date, id"),
        &[
            &user_id as &dyn rusqlite::ToSql,
            &start.to_string(),
            &end.to_string(),
        ],
    )
}

pub fn get_recent_transactions(
    conn: &Connection,
    user_id: i64,
    limit: i64,
) -> LedgerResult<Vec<Transaction>> {
    collect_transactions(
        conn,
        &tx_select("WHERE user_id=?1 ORDER BY date DESC, id DESC LIMIT ?2"),
        &[&user_id as &dyn rusqlite::ToSql, &limit],
    )
}

pub fn get_transactions_with_pagination(
    conn: &Connection,
    user_id: i64,
    page: i64,
    page_size: i64,
) -> LedgerResult<TransactionPage> {
    if page < 1 || page_size < 1 {
        return Err(LedgerError::InvalidInput(format!(
            "page and page size must be at least 1, got page {page} size {page_size}"
        )));
    }
    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .map_err(|e| LedgerError::infrastructure("count transactions", e))?;
    let offset = (page - 1) * page_size;
    let transactions = collect_transactions(
        conn,
        &tx_select("WHERE user_id=?1 ORDER BY date DESC, id DESC LIMIT ?2 OFFSET ?3"),
        &[&user_id as &dyn rusqlite::ToSql, &page_size, &offset],
    )?;
    Ok(TransactionPage {
        transactions,
        total,
        page,
        page_size,
    })
}

fn sum_amounts(
    conn: &Connection,
    user_id: i64,
    kind: FlowKind,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    // Amounts live in TEXT columns; summing happens in Decimal, not SQL.
    let mut stmt = conn.prepare(
        "SELECT amount FROM transactions WHERE user_id=?1 AND kind=?2 AND date>=?3 AND date<=?4",
    )?;
    let rows = stmt.query_map(
        params![user_id, kind.as_str(), start.to_string(), end.to_string()],
        |r| r.get::<_, String>(0),
    )?;
    let mut total = Decimal::ZERO;
    for row in rows {
        total += stored_decimal(&row?, "read transaction amount")?;
    }
    Ok(total)
}

pub fn calculate_total_income(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    sum_amounts(conn, user_id, FlowKind::Income, start, end)
}

pub fn calculate_total_expense(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    sum_amounts(conn, user_id, FlowKind::Expense, start, end)
}

fn totals_by_category(
    conn: &Connection,
    user_id: i64,
    kind: FlowKind,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryTotal>> {
    let mut stmt = conn.prepare(
        "SELECT t.category_id, c.name, t.amount
         FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE t.user_id=?1 AND t.kind=?2 AND t.date>=?3 AND t.date<=?4",
    )?;
    let rows = stmt.query_map(
        params![user_id, kind.as_str(), start.to_string(), end.to_string()],
        |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        },
    )?;
    let mut agg: BTreeMap<i64, (String, Decimal)> = BTreeMap::new();
    for row in rows {
        let (category_id, name, amount) = row?;
        let amount = stored_decimal(&amount, "read transaction amount")?;
        agg.entry(category_id)
            .and_modify(|(_, total)| *total += amount)
            .or_insert((name, amount));
    }
    let mut totals: Vec<CategoryTotal> = agg
        .into_iter()
        .map(|(category_id, (category, total))| CategoryTotal {
            category_id,
            category,
            total,
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(totals)
}

pub fn calculate_income_by_category(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryTotal>> {
    totals_by_category(conn, user_id, FlowKind::Income, start, end)
}

pub fn calculate_expense_by_category(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<CategoryTotal>> {
    totals_by_category(conn, user_id, FlowKind::Expense, start, end)
}

// --- budgets ---

fn budget_from_parts(
    id: i64,
    user_id: i64,
    name: String,
    start_date: String,
    period: String,
    total_amount: String,
) -> LedgerResult<Budget> {
    Ok(Budget {
        id,
        user_id,
        name,
        start_date: stored_date(&start_date, "read budget start date")?,
        period: BudgetPeriod::parse(&period)
            .ok_or_else(|| LedgerError::corrupt("read budget period", &period))?,
        total_amount: stored_decimal(&total_amount, "read budget total")?,
    })
}

pub fn create_budget(
    conn: &Connection,
    user_id: i64,
    name: &str,
    start_date: NaiveDate,
    period: BudgetPeriod,
    total_amount: Decimal,
) -> LedgerResult<Budget> {
    if total_amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "budget total must be positive, got {total_amount}"
        )));
    }
    conn.execute(
        "INSERT INTO budgets(user_id, name, start_date, period, total_amount)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            name,
            start_date.to_string(),
            period.as_str(),
            total_amount.to_string()
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::Conflict(format!("budget '{name}' already exists for this user"))
        } else {
            LedgerError::infrastructure("create budget", e)
        }
    })?;
    Ok(Budget {
        id: conn.last_insert_rowid(),
        user_id,
        name: name.to_string(),
        start_date,
        period,
        total_amount,
    })
}

pub fn find_budget_owned(conn: &Connection, user_id: i64, id: i64) -> LedgerResult<Budget> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, start_date, period, total_amount FROM budgets WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                ))
            },
        )
        .optional()
        .map_err(|e| LedgerError::infrastructure("find budget", e))?;
    let (id, owner, name, start_date, period, total_amount) = row.ok_or(LedgerError::NotFound {
        entity: "budget",
        id,
    })?;
    if owner != user_id {
        return Err(LedgerError::Ownership {
            entity: "budget",
            id,
            user_id,
        });
    }
    budget_from_parts(id, owner, name, start_date, period, total_amount)
}

pub fn list_budgets(conn: &Connection, user_id: i64) -> LedgerResult<Vec<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, start_date, period, total_amount
         FROM budgets WHERE user_id=?1 ORDER BY start_date, name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;
    let mut budgets = Vec::new();
    for row in rows {
        let (id, owner, name, start_date, period, total_amount) = row?;
        budgets.push(budget_from_parts(
            id,
            owner,
            name,
            start_date,
            period,
            total_amount,
        )?);
    }
    Ok(budgets)
}

pub fn budget_categories_for(conn: &Connection, budget_id: i64) -> LedgerResult<Vec<BudgetCategory>> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_id, category_id, allocated, spent
         FROM budget_categories WHERE budget_id=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![budget_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, budget_id, category_id, allocated, spent) = row?;
        out.push(BudgetCategory {
            id,
            budget_id,
            category_id,
            allocated: stored_decimal(&allocated, "read budget allocation")?,
            spent: stored_decimal(&spent, "read budget spent")?,
        });
    }
    Ok(out)
}

/// Allocate (or re-allocate) part of a budget's total to an expense
/// category. The allocation sum may never exceed the budget total.
pub fn allocate_budget_category(
    conn: &Connection,
    user_id: i64,
    budget_id: i64,
    category_id: i64,
    allocated: Decimal,
) -> LedgerResult<BudgetCategory> {
    if allocated <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "allocation must be positive, got {allocated}"
        )));
    }
    let budget = find_budget_owned(conn, user_id, budget_id)?;
    let category = find_category(conn, category_id)?;
    if category.kind != FlowKind::Expense {
        return Err(LedgerError::InvalidInput(format!(
            "only expense categories may be allocated, '{}' is an income category",
            category.name
        )));
    }
    let existing = budget_categories_for(conn, budget_id)?;
    let prior: Decimal = existing
        .iter()
        .filter(|bc| bc.category_id != category_id)
        .map(|bc| bc.allocated)
        .sum();
    if prior + allocated > budget.total_amount {
        return Err(LedgerError::Conflict(format!(
            "allocation {allocated} exceeds remaining budget ({} of {} already allocated)",
            prior, budget.total_amount
        )));
    }
    if let Some(current) = existing.iter().find(|bc| bc.category_id == category_id) {
        conn.execute(
            "UPDATE budget_categories SET allocated=?1 WHERE id=?2",
            params![allocated.to_string(), current.id],
        )
        .map_err(|e| LedgerError::infrastructure("update allocation", e))?;
        return Ok(BudgetCategory {
            allocated,
            ..current.clone()
        });
    }
    conn.execute(
        "INSERT INTO budget_categories(budget_id, category_id, allocated) VALUES (?1, ?2, ?3)",
        params![budget_id, category_id, allocated.to_string()],
    )
    .map_err(|e| LedgerError::infrastructure("insert allocation", e))?;
    Ok(BudgetCategory {
        id: conn.last_insert_rowid(),
        budget_id,
        category_id,
        allocated,
        spent: Decimal::ZERO,
    })
}

/// Apply `delta` to the spent amount of every budget-category of this user
/// whose category matches and whose budget window covers `date`. Returns
/// how many rows were touched. No floor: reversals may push spent below
/// zero transiently, which callers accept.
pub fn adjust_budget_spent(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    date: NaiveDate,
    delta: Decimal,
) -> LedgerResult<usize> {
    let mut stmt = conn.prepare(
        "SELECT bc.id, bc.spent, b.start_date, b.period
         FROM budget_categories bc JOIN budgets b ON bc.budget_id=b.id
         WHERE b.user_id=?1 AND bc.category_id=?2",
    )?;
    let rows = stmt.query_map(params![user_id, category_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut matches = Vec::new();
    for row in rows {
        let (id, spent, start_date, period) = row?;
        let start = stored_date(&start_date, "read budget start date")?;
        let period = BudgetPeriod::parse(&period)
            .ok_or_else(|| LedgerError::corrupt("read budget period", &period))?;
        if start <= date && date < period.window_end(start) {
            matches.push((id, stored_decimal(&spent, "read budget spent")?));
        }
    }
    for (id, spent) in &matches {
        conn.execute(
            "UPDATE budget_categories SET spent=?1 WHERE id=?2",
            params![(spent + delta).to_string(), id],
        )
        .map_err(|e| LedgerError::infrastructure("update budget spent", e))?;
    }
    Ok(matches.len())
}
