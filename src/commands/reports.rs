// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;

use crate::models::FlowKind;
use crate::utils::{
    fmt_money, id_for_account, maybe_print_json, parse_date, parse_kind, pretty_table,
};
use crate::{reconstruct, store, trends};

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("trend", sub)) => trend(conn, user_id, sub)?,
        Some(("balance-trend", sub)) => balance_trend(conn, user_id, sub)?,
        Some(("distribution", sub)) => distribution(conn, user_id, sub)?,
        Some(("networth", sub)) => networth(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn trend(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let interval =
        trends::Interval::parse(sub.get_one::<String>("interval").unwrap()).context("Invalid interval")?;
    let points = trends::income_expense_trend(conn, user_id, start, end, interval)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &points)? {
        let rows = points
            .into_iter()
            .map(|p| {
                vec![
                    p.bucket.to_string(),
                    fmt_money(&p.income),
                    fmt_money(&p.expense),
                    fmt_money(&(p.income - p.expense)),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Bucket", "Income", "Expense", "Net"], rows)
        );
    }
    Ok(())
}

fn balance_trend(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let account_ids = sub
        .get_one::<String>("accounts")
        .map(|names| {
            names
                .split(',')
                .map(|name| id_for_account(conn, user_id, name.trim()))
                .collect::<Result<Vec<i64>>>()
        })
        .transpose()?;
    let series =
        trends::account_balance_trend(conn, user_id, account_ids.as_deref(), start, end)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &series)? {
        let mut rows = Vec::new();
        for s in &series {
            for p in &s.points {
                rows.push(vec![
                    s.account.clone(),
                    p.date.to_string(),
                    fmt_money(&p.balance),
                ]);
            }
        }
        println!("{}", pretty_table(&["Account", "Date", "Balance"], rows));
    }
    Ok(())
}

fn distribution(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let kind = parse_kind(sub.get_one::<String>("kind").unwrap())?;
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let end = parse_date(sub.get_one::<String>("end").unwrap())?;
    let shares = match kind {
        FlowKind::Income => trends::income_category_distribution(conn, user_id, start, end)?,
        FlowKind::Expense => trends::expense_category_distribution(conn, user_id, start, end)?,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &shares)? {
        let rows = shares
            .into_iter()
            .map(|s| {
                vec![
                    s.category,
                    fmt_money(&s.amount),
                    format!("{:.1}%", s.share),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Amount", "Share"], rows));
    }
    Ok(())
}

fn networth(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let as_of = sub
        .get_one::<String>("as-of")
        .map(|s| parse_date(s))
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());
    let accounts = store::list_accounts(conn, user_id)?;
    let history = store::transactions_for_user(conn, user_id)?;
    let worth = reconstruct::net_worth_at(&accounts, as_of, &history);
    println!("Net worth on {}: {}", as_of, fmt_money(&worth));
    Ok(())
}
