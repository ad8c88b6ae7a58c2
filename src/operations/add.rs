use crate::error::ValidationError;
use crate::models::expense::Expense;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

// Amounts are stored as JSON numbers, so keep them exact in an f64.
const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x3_8D7E, 0, false, 0); // 1e15
const MAX_SIGNIFICANT_DIGITS: usize = 15;

#[derive(Debug, Clone)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub date: String,
    category: String,
    categories: Vec<String>,
}

impl ExpenseForm {
    pub fn new(categories: &[String]) -> Self {
        let categories = categories.to_vec();
        let category = categories.first().cloned().unwrap_or_default();
        Self {
            description: String::new(),
            amount: String::new(),
            date: String::new(),
            category,
            categories,
        }
    }

    pub fn from_parts(
        categories: &[String],
        description: &str,
        amount: &str,
        date: &str,
        category: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let mut form = Self::new(categories);
        form.description = description.to_string();
        form.amount = amount.to_string();
        form.date = date.to_string();
        if let Some(category) = category {
            form.set_category(category)?;
        }
        Ok(form)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn set_category(&mut self, label: &str) -> Result<(), ValidationError> {
        let label = label.trim();
        match self.categories.iter().find(|c| c.eq_ignore_ascii_case(label)) {
            Some(found) => {
                self.category = found.clone();
                Ok(())
            }
            None => Err(ValidationError::UnknownCategory(label.to_string())),
        }
    }

    pub fn cycle_category(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        let current = self
            .categories
            .iter()
            .position(|c| *c == self.category)
            .unwrap_or(0);
        self.category = self.categories[(current + 1) % self.categories.len()].clone();
    }

    pub fn submit(&mut self) -> Result<Expense, ValidationError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        let amount = parse_amount(&self.amount)?;

        let date_str = self.date.trim();
        if date_str.is_empty() {
            return Err(ValidationError::MissingDate);
        }
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date_str.to_string()))?;

        let expense = Expense::new(
            Uuid::new_v4().to_string(),
            description.to_string(),
            amount,
            date,
            self.category.clone(),
        );

        self.reset();
        Ok(expense)
    }

    pub fn reset(&mut self) {
        self.description.clear();
        self.amount.clear();
        self.date.clear();
        self.category = self.categories.first().cloned().unwrap_or_default();
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    let invalid = || ValidationError::InvalidAmount(trimmed.to_string());
    if trimmed.contains('_') {
        return Err(invalid());
    }
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| invalid())?;
    if amount <= Decimal::ZERO || amount >= MAX_AMOUNT {
        return Err(invalid());
    }
    let digits = amount.normalize().mantissa().unsigned_abs().to_string().len();
    if digits > MAX_SIGNIFICANT_DIGITS {
        return Err(invalid());
    }
    Ok(amount.normalize())
}
