use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
}

impl Expense {
    pub fn new(id: String, description: String, amount: Decimal, date: NaiveDate, category: String) -> Self {
        Self {
            id,
            description,
            amount,
            date,
            category,
        }
    }

    pub fn year_month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn display_date(&self) -> String {
        format!("{}/{}/{}", self.date.month(), self.date.day(), self.date.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_expense() -> Expense {
        Expense::new(
            "abc".to_string(),
            "Coffee".to_string(),
            Decimal::new(35, 1),
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            "Food".to_string(),
        )
    }

    #[test]
    fn test_year_month_is_iso_prefix() {
        let expense = create_test_expense();
        assert_eq!(expense.year_month(), "2025-01");
        assert_eq!(expense.iso_date(), "2025-01-05");
    }

    #[test]
    fn test_display_date_is_unpadded() {
        assert_eq!(create_test_expense().display_date(), "1/5/2025");
    }

    #[test]
    fn test_serializes_with_stored_field_names() {
        let json = serde_json::to_value(create_test_expense()).unwrap();
        assert_eq!(json["desc"], "Coffee");
        assert_eq!(json["amount"], 3.5);
        assert_eq!(json["date"], "2025-01-05");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_deserializes_stored_record() {
        let raw = r#"{"id":"k1","desc":"Bus","amount":12,"date":"2025-02-01","category":"Transportation"}"#;
        let expense: Expense = serde_json::from_str(raw).unwrap();
        assert_eq!(expense.description, "Bus");
        assert_eq!(expense.amount, Decimal::new(12, 0));
        assert_eq!(expense.year_month(), "2025-02");
    }
}
