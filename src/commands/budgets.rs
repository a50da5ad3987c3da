// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::models::{BudgetPeriod, FlowKind};
use crate::utils::{fmt_money, id_for_category, maybe_print_json, parse_date, parse_decimal, pretty_table};
use crate::{store, trends};

fn id_for_budget(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM budgets WHERE user_id=?1 AND name=?2")?;
    let id: i64 = stmt
        .query_row(params![user_id, name], |r| r.get(0))
        .with_context(|| format!("Budget '{}' not found", name))?;
    Ok(id)
}

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let start = parse_date(sub.get_one::<String>("start").unwrap())?;
            let period = BudgetPeriod::parse(sub.get_one::<String>("period").unwrap())
                .context("Invalid period")?;
            let total = parse_decimal(sub.get_one::<String>("total").unwrap())?;
            let budget = store::create_budget(conn, user_id, name, start, period, total)?;
            println!(
                "Created {} budget '{}' of {} starting {}",
                budget.period.as_str(),
                budget.name,
                fmt_money(&budget.total_amount),
                budget.start_date
            );
        }
        Some(("allocate", sub)) => {
            let budget_name = sub.get_one::<String>("budget").unwrap();
            let category_name = sub.get_one::<String>("category").unwrap();
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let budget_id = id_for_budget(conn, user_id, budget_name)?;
            let category_id = id_for_category(conn, category_name, FlowKind::Expense)?;
            store::allocate_budget_category(conn, user_id, budget_id, category_id, amount)?;
            println!(
                "Allocated {} of '{}' to '{}'",
                fmt_money(&amount),
                budget_name,
                category_name
            );
        }
        Some(("list", sub)) => {
            let budgets = store::list_budgets(conn, user_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budgets)? {
                let rows = budgets
                    .into_iter()
                    .map(|b| {
                        vec![
                            b.name.clone(),
                            b.start_date.to_string(),
                            b.window_end().to_string(),
                            b.period.as_str().to_string(),
                            fmt_money(&b.total_amount),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Start", "End", "Period", "Total"], rows)
                );
            }
        }
        Some(("execution", sub)) => {
            let start = parse_date(sub.get_one::<String>("start").unwrap())?;
            let end = parse_date(sub.get_one::<String>("end").unwrap())?;
            let summary = trends::budget_execution_statistics(conn, user_id, start, end)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
                let rows = summary
                    .budgets
                    .iter()
                    .map(|b| {
                        vec![
                            b.name.clone(),
                            fmt_money(&b.total_amount),
                            fmt_money(&b.spent),
                            format!("{:.1}%", b.usage_percent),
                            b.health.as_str().to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Budget", "Total", "Spent", "Usage", "Health"], rows)
                );
                println!(
                    "Budgeted {} / spent {}: {} healthy, {} near limit, {} over budget",
                    fmt_money(&summary.total_budgeted),
                    fmt_money(&summary.total_spent),
                    summary.healthy,
                    summary.near_limit,
                    summary.over_budget
                );
            }
        }
        _ => {}
    }
    Ok(())
}
