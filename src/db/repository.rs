use super::kv_store::KeyValueStore;
use super::persistent_store::PersistentStore;
use crate::models::expense::Expense;
use tracing::debug;

pub const STORAGE_KEY: &str = "expenses_v1";

pub struct ExpenseRepository<S: KeyValueStore> {
    persistence: PersistentStore<S>,
    key: String,
    expenses: Vec<Expense>,
}

impl<S: KeyValueStore> ExpenseRepository<S> {
    #[cfg(test)]
    pub fn open(store: S) -> Self {
        Self::open_with_key(store, STORAGE_KEY)
    }

    pub fn open_with_key(store: S, key: &str) -> Self {
        let persistence = PersistentStore::new(store);
        let expenses: Vec<Expense> = persistence.load(key, Vec::new());
        debug!("Loaded {} expenses from '{}'", expenses.len(), key);
        Self {
            persistence,
            key: key.to_string(),
            expenses,
        }
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn add(&mut self, expense: Expense) {
        debug!("Adding expense {}", expense.id);
        let mut next = Vec::with_capacity(self.expenses.len() + 1);
        next.push(expense);
        next.extend(self.expenses.iter().cloned());
        self.replace(next);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let next: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();
        let removed = next.len() != self.expenses.len();
        debug!("Removing expense {} (found: {})", id, removed);
        self.replace(next);
        removed
    }

    pub fn clear(&mut self) {
        debug!("Clearing {} expenses", self.expenses.len());
        self.replace(Vec::new());
    }

    fn replace(&mut self, next: Vec<Expense>) {
        self.expenses = next;
        self.persistence.save(&self.key, &self.expenses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::connection::{establish_connection, establish_test_connection};
    use crate::db::kv_store::{MemoryStore, SqliteStore};
    use crate::operations::add::ExpenseForm;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn create_test_expense(id: &str) -> Expense {
        Expense::new(
            id.to_string(),
            "Test Expense".to_string(),
            Decimal::new(1050, 2),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            "Food".to_string(),
        )
    }

    #[test]
    fn test_open_empty_store() {
        let repo = ExpenseRepository::open(MemoryStore::default());
        assert!(repo.expenses().is_empty());
    }

    #[test]
    fn test_open_malformed_store_is_empty() {
        let repo = ExpenseRepository::open(MemoryStore::with_entry(STORAGE_KEY, "][garbage"));
        assert!(repo.expenses().is_empty());
    }

    #[test]
    fn test_open_discards_structurally_invalid_records() {
        let raw = r#"[{"id":"1","desc":"ok","amount":1,"date":"2025-01-01","category":"Food"},{"id":"2"}]"#;
        let repo = ExpenseRepository::open(MemoryStore::with_entry(STORAGE_KEY, raw));
        assert!(repo.expenses().is_empty());
    }

    #[test]
    fn test_add_prepends_and_persists() {
        let mut repo = ExpenseRepository::open(MemoryStore::default());
        repo.add(create_test_expense("first"));
        repo.add(create_test_expense("second"));

        let ids: Vec<&str> = repo.expenses().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);

        let stored = repo.store().raw(STORAGE_KEY).unwrap();
        assert!(stored.starts_with(r#"[{"id":"second""#));
    }

    #[test]
    fn test_remove_existing() {
        let mut repo = ExpenseRepository::open(MemoryStore::default());
        let id = Uuid::new_v4().to_string();
        repo.add(create_test_expense(&id));
        repo.add(create_test_expense("other"));

        assert!(repo.remove(&id));
        assert_eq!(repo.expenses().len(), 1);
        assert!(repo.expenses().iter().all(|e| e.id != id));
    }

    #[test]
    fn test_remove_missing_is_noop_but_persists() {
        let mut repo = ExpenseRepository::open(MemoryStore::default());
        assert!(!repo.remove("missing"));
        assert_eq!(repo.expenses().len(), 0);
        assert_eq!(repo.store().raw(STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_clear() {
        let mut repo = ExpenseRepository::open(MemoryStore::default());
        repo.add(create_test_expense("a"));
        repo.add(create_test_expense("b"));

        repo.clear();
        assert!(repo.expenses().is_empty());
        assert_eq!(repo.store().raw(STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let memory = MemoryStore::default();
        memory.set_reject_writes(true);
        let mut repo = ExpenseRepository::open(memory);

        repo.add(create_test_expense("a"));
        assert_eq!(repo.expenses().len(), 1);
        assert_eq!(repo.store().raw(STORAGE_KEY), None);
    }

    #[test]
    fn test_reopen_sqlite_store_restores_collection() {
        let conn = establish_test_connection().unwrap();
        let mut repo = ExpenseRepository::open(SqliteStore::new(conn));
        repo.add(create_test_expense("a"));
        repo.add(create_test_expense("b"));

        let raw = repo.store().get(STORAGE_KEY).unwrap().unwrap();
        let reopened = ExpenseRepository::open(MemoryStore::with_entry(STORAGE_KEY, &raw));
        assert_eq!(reopened.expenses(), repo.expenses());
    }

    fn submitted_expense(description: &str, amount: &str) -> Expense {
        ExpenseForm::from_parts(&Config::default().categories, description, amount, "2025-01-15", None)
            .unwrap()
            .submit()
            .unwrap()
    }

    #[test]
    fn test_accepted_amounts_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expenses.db");
        let path = path.to_str().unwrap();

        let mut repo = ExpenseRepository::open(SqliteStore::new(establish_connection(path).unwrap()));
        repo.add(submitted_expense("Largest", "999999999999999"));
        repo.add(submitted_expense("Precise", "0.123456789012345"));
        repo.add(submitted_expense("Mixed", "12345678.1234567"));
        repo.add(submitted_expense("Coffee", "3.50"));
        drop(repo);

        let reopened = ExpenseRepository::open(SqliteStore::new(establish_connection(path).unwrap()));
        let amounts: Vec<Decimal> = reopened.expenses().iter().map(|e| e.amount).collect();
        let expected: Vec<Decimal> = ["3.5", "12345678.1234567", "0.123456789012345", "999999999999999"]
            .iter()
            .map(|raw| Decimal::from_str(raw).unwrap())
            .collect();
        assert_eq!(amounts, expected);
    }

    #[test]
    fn test_unrepresentable_amounts_never_reach_storage() {
        let categories = Config::default().categories;
        for raw in ["79228162514264337593543950335", "0.123456789012345678901"] {
            let mut form =
                ExpenseForm::from_parts(&categories, "Too much", raw, "2025-01-15", None).unwrap();
            assert!(form.submit().is_err(), "amount {:?}", raw);
        }

        let mut repo = ExpenseRepository::open(MemoryStore::default());
        repo.add(submitted_expense("Coffee", "3.5"));
        let raw = repo.store().raw(STORAGE_KEY).unwrap();
        let reopened = ExpenseRepository::open(MemoryStore::with_entry(STORAGE_KEY, &raw));
        assert_eq!(reopened.expenses(), repo.expenses());
    }
}
