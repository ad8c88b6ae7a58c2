use crate::models::expense::Expense;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub month: Option<String>,
    pub search: String,
}

impl ViewFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(month) = self.month.as_deref() {
            if !month.is_empty() && expense.year_month() != month {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty()
            && !expense.description.to_lowercase().contains(&needle)
            && !expense.category.to_lowercase().contains(&needle)
        {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView {
    pub filtered: Vec<Expense>,
    pub summary: Summary,
    pub months: Vec<String>,
    pub empty_state: Option<EmptyState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoExpenses,
    NoMatches,
}

impl EmptyState {
    pub fn title(self) -> &'static str {
        match self {
            EmptyState::NoExpenses => "No expenses yet",
            EmptyState::NoMatches => "No expenses match the current filters",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            EmptyState::NoExpenses => "Start by adding your first expense",
            EmptyState::NoMatches => "Try another month or search term",
        }
    }
}

pub fn filter_expenses(expenses: &[Expense], filter: &ViewFilter) -> Vec<Expense> {
    expenses
        .iter()
        .filter(|expense| filter.matches(expense))
        .cloned()
        .collect()
}

pub fn summarize(expenses: &[Expense]) -> Summary {
    let total = expenses.iter().fold(Decimal::ZERO, |acc, expense| {
        acc.checked_add(expense.amount).unwrap_or_else(|| {
            warn!("Total overflowed at expense {}, saturating", expense.id);
            if expense.amount.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        })
    });
    let count = expenses.len();
    let average = if count > 0 {
        total / Decimal::from(count)
    } else {
        Decimal::ZERO
    };
    Summary { total, count, average }
}

pub fn distinct_months(expenses: &[Expense]) -> Vec<String> {
    let months: BTreeSet<String> = expenses.iter().map(|e| e.year_month()).collect();
    months.into_iter().rev().collect()
}

pub fn derive_view(expenses: &[Expense], filter: &ViewFilter) -> DerivedView {
    let filtered = filter_expenses(expenses, filter);
    let summary = summarize(&filtered);
    let empty_state = if !filtered.is_empty() {
        None
    } else if expenses.is_empty() {
        Some(EmptyState::NoExpenses)
    } else {
        Some(EmptyState::NoMatches)
    };
    DerivedView {
        filtered,
        summary,
        months: distinct_months(expenses),
        empty_state,
    }
}

pub fn format_money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

pub fn format_with_currency(amount: Decimal, currency: &str) -> String {
    if currency.is_empty() {
        format_money(amount)
    } else {
        format!("{} {}", format_money(amount), currency)
    }
}

fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("valid month regex"))
}

pub fn validate_month(input: &str) -> Result<Option<String>, String> {
    let month = input.trim();
    if month.is_empty() {
        return Ok(None);
    }
    if !month_pattern().is_match(month) {
        return Err(format!("Invalid month '{}'. Use YYYY-MM.", month));
    }
    Ok(Some(month.to_string()))
}
