// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of money flow. Used both as a transaction kind and as a
/// category kind; a transaction's category must carry the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Income,
    Expense,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Income => "income",
            FlowKind::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(FlowKind::Income),
            "expense" => Some(FlowKind::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// Balance is derived state: only the recorder and the reversal engine
/// write it, never callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub balance: Decimal,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: FlowKind,
}

/// A single ledger event. The referenced account's role follows the kind:
/// income flows into it, expense flows out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub kind: FlowKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: i64,
    pub account_id: i64,
}

impl Transaction {
    pub fn destination_account(&self) -> Option<i64> {
        matches!(self.kind, FlowKind::Income).then_some(self.account_id)
    }

    pub fn source_account(&self) -> Option<i64> {
        matches!(self.kind, FlowKind::Expense).then_some(self.account_id)
    }

    /// The delta this transaction applied to its account's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            FlowKind::Income => self.amount,
            FlowKind::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(BudgetPeriod::Weekly),
            "monthly" => Some(BudgetPeriod::Monthly),
            "yearly" => Some(BudgetPeriod::Yearly),
            _ => None,
        }
    }

    /// Exclusive end of a window opening at `start`.
    pub fn window_end(&self, start: NaiveDate) -> NaiveDate {
        match self {
            BudgetPeriod::Weekly => start + Duration::days(7),
            BudgetPeriod::Monthly => start + Months::new(1),
            BudgetPeriod::Yearly => start + Months::new(12),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub period: BudgetPeriod,
    pub total_amount: Decimal,
}

impl Budget {
    pub fn window_end(&self) -> NaiveDate {
        self.period.window_end(self.start_date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.window_end()
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start < self.window_end()
    }
}

/// Per-category slice of a budget's total, with its running consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub allocated: Decimal,
    pub spent: Decimal,
}

// --- plain value objects returned across the presentation boundary ---

#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryShare {
    pub category_id: i64,
    pub category: String,
    pub amount: Decimal,
    /// Percentage of the period total, 0 to 100.
    pub share: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub bucket: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalanceSeries {
    pub account_id: i64,
    pub account: String,
    pub points: Vec<BalancePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetHealth {
    Healthy,
    NearLimit,
    OverBudget,
}

impl BudgetHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetHealth::Healthy => "healthy",
            BudgetHealth::NearLimit => "near-limit",
            BudgetHealth::OverBudget => "over-budget",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetExecution {
    pub budget_id: i64,
    pub name: String,
    pub total_amount: Decimal,
    pub spent: Decimal,
    pub usage_percent: Decimal,
    pub health: BudgetHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetExecutionSummary {
    pub budgets: Vec<BudgetExecution>,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub healthy: usize,
    pub near_limit: usize,
    pub over_budget: usize,
}
