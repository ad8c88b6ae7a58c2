use crate::db::repository::STORAGE_KEY;

pub const DEFAULT_DB_PATH: &str = "expense_tracker.db";
pub const DEFAULT_CURRENCY: &str = "EGP";
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Food",
    "Transportation",
    "Housing",
    "Healthcare",
    "Entertainment",
    "Other",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub categories: Vec<String>,
    pub currency: String,
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            currency: DEFAULT_CURRENCY.to_string(),
            storage_key: STORAGE_KEY.to_string(),
        }
    }
}

impl Config {
    pub fn new(db_path: Option<String>, categories: Option<&str>, currency: Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(path) = db_path {
            config.db_path = path;
        }
        if let Some(raw) = categories {
            config.categories = parse_categories(raw)?;
        }
        if let Some(currency) = currency {
            config.currency = currency.trim().to_string();
        }
        Ok(config)
    }
}

pub fn parse_categories(raw: &str) -> Result<Vec<String>, String> {
    let mut categories: Vec<String> = Vec::new();
    for label in raw.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !categories.iter().any(|c| c.eq_ignore_ascii_case(label)) {
            categories.push(label.to_string());
        }
    }
    if categories.is_empty() {
        return Err("At least one category is required".to_string());
    }
    Ok(categories)
}
