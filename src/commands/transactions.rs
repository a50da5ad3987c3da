// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::models::{FlowKind, Transaction};
use crate::utils::{
    fmt_money, id_for_account, id_for_category, id_for_category_any, maybe_print_json, parse_date,
    parse_decimal, parse_kind, pretty_table,
};
use crate::{recorder, reversal, store};

pub fn handle(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("income", sub)) => record(conn, user_id, FlowKind::Income, sub)?,
        Some(("expense", sub)) => record(conn, user_id, FlowKind::Expense, sub)?,
        Some(("update", sub)) => update(conn, user_id, sub)?,
        Some(("delete", sub)) => delete(conn, user_id, sub)?,
        Some(("recent", sub)) => recent(conn, user_id, sub)?,
        Some(("list", sub)) => list(conn, user_id, sub)?,
        Some(("totals", sub)) => totals(conn, user_id, sub)?,
        Some(("by-category", sub)) => by_category(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn record(
    conn: &mut Connection,
    user_id: i64,
    kind: FlowKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let account_name = sub.get_one::<String>("account").unwrap();
    let category_name = sub.get_one::<String>("category").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = sub
        .get_one::<String>("date")
        .map(|s| parse_date(s))
        .transpose()?;
    let desc = sub.get_one::<String>("desc").unwrap();

    let account_id = id_for_account(conn, user_id, account_name)?;
    let category_id = id_for_category(conn, category_name, kind)?;
    let tx = match kind {
        FlowKind::Income => {
            recorder::record_income(conn, user_id, account_id, category_id, amount, date, desc)?
        }
        FlowKind::Expense => {
            recorder::record_expense(conn, user_id, account_id, category_id, amount, date, desc)?
        }
    };
    println!(
        "Recorded {} {} on '{}' ({}, tx {})",
        kind.as_str(),
        fmt_money(&tx.amount),
        account_name,
        tx.date,
        tx.id
    );
    Ok(())
}

fn update(conn: &mut Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let update = recorder::TransactionUpdate {
        kind: None,
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        description: sub.get_one::<String>("desc").cloned(),
        category_id: sub
            .get_one::<String>("category")
            .map(|name| id_for_category_any(conn, name))
            .transpose()?,
    };
    let tx = recorder::update_transaction(conn, user_id, id, &update)?;
    println!("Updated transaction {} ({} {})", tx.id, tx.kind.as_str(), fmt_money(&tx.amount));
    Ok(())
}

fn delete(conn: &mut Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let reverse = !sub.get_flag("keep-balances");
    reversal::delete_transaction(conn, user_id, id, reverse)?;
    if reverse {
        println!("Deleted transaction {} and reversed its effect", id);
    } else {
        println!("Deleted transaction {} (balances kept)", id);
    }
    Ok(())
}

fn name_maps(
    conn: &Connection,
    user_id: i64,
) -> Result<(HashMap<i64, String>, HashMap<i64, String>)> {
    let accounts = store::list_accounts(conn, user_id)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let categories = store::list_categories(conn, None)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    Ok((accounts, categories))
}

fn tx_rows(
    transactions: &[Transaction],
    accounts: &HashMap<i64, String>,
    categories: &HashMap<i64, String>,
) -> Vec<Vec<String>> {
    transactions
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.date.to_string(),
                t.kind.as_str().to_string(),
                fmt_money(&t.amount),
                accounts.get(&t.account_id).cloned().unwrap_or_default(),
                categories.get(&t.category_id).cloned().unwrap_or_default(),
                t.description.clone(),
            ]
        })
        .collect()
}

const TX_HEADERS: [&str; 7] = ["Id", "Date", "Kind", "Amount", "Account", "Category", "Description"];

fn recent(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let transactions = store::get_recent_transactions(conn, user_id, limit)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &transactions)? {
        let (accounts, categories) = name_maps(conn, user_id)?;
        let rows = tx_rows(&transactions, &accounts, &categories);
        println!("{}", pretty_table(&TX_HEADERS, rows));
    }
    Ok(())
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let page = *sub.get_one::<i64>("page").unwrap();
    let page_size = *sub.get_one::<i64>("page-size").unwrap();
    let page = store::get_transactions_with_pagination(conn, user_id, page, page_size)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &page)? {
        let (accounts, categories) = name_maps(conn, user_id)?;
        let rows = tx_rows(&page.transactions, &accounts, &categories);
        println!("{}", pretty_table(&TX_HEADERS, rows));
        println!(
            "Page {} of {} ({} transactions)",
            page.page,
            (page.total + page.page_size - 1) / page.page_size.max(1),
            page.total
        );
    }
    Ok(())
}

fn totals(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let income = store::calculate_total_income(conn, user_id, start, end)?;
    let expense = store::calculate_total_expense(conn, user_id, start, end)?;
    let rows = vec![
        vec!["Income".to_string(), fmt_money(&income)],
        vec!["Expense".to_string(), fmt_money(&expense)],
        vec!["Net".to_string(), fmt_money(&(income - expense))],
    ];
    println!("{}", pretty_table(&["", "Total"], rows));
    Ok(())
}

fn by_category(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let kind = parse_kind(sub.get_one::<String>("kind").unwrap())?;
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let totals = match kind {
        FlowKind::Income => store::calculate_income_by_category(conn, user_id, start, end)?,
        FlowKind::Expense => store::calculate_expense_by_category(conn, user_id, start, end)?,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &totals)? {
        let rows = totals
            .into_iter()
            .map(|t| vec![t.category, fmt_money(&t.total)])
            .collect();
        println!("{}", pretty_table(&["Category", "Total"], rows));
    }
    Ok(())
}
