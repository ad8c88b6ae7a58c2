use crate::db::kv_store::KeyValueStore;
use crate::db::repository::ExpenseRepository;
use crate::models::expense::Expense;
use crate::operations::add::ExpenseForm;
use crate::operations::export::{self, ExportSink};
use crate::operations::view::{DerivedView, ViewFilter, derive_view};
use crate::prompt::Prompter;
use std::path::PathBuf;

pub const CONFIRM_DELETE: &str = "Are you sure you want to delete this expense?";
pub const CONFIRM_CLEAR: &str = "Are you sure you want to clear all expenses?";

type Listener = Box<dyn FnMut(&DerivedView)>;

pub struct Tracker<S: KeyValueStore> {
    repository: ExpenseRepository<S>,
    categories: Vec<String>,
    filter: ViewFilter,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(repository: ExpenseRepository<S>, categories: Vec<String>) -> Self {
        Self {
            repository,
            categories,
            filter: ViewFilter::default(),
            listeners: Vec::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn expenses(&self) -> &[Expense] {
        self.repository.expenses()
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn new_form(&self) -> ExpenseForm {
        ExpenseForm::new(&self.categories)
    }

    pub fn view(&self) -> DerivedView {
        derive_view(self.repository.expenses(), &self.filter)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DerivedView) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn submit(&mut self, form: &mut ExpenseForm, prompter: &mut dyn Prompter) -> Option<Expense> {
        match form.submit() {
            Ok(expense) => {
                self.repository.add(expense.clone());
                self.changed();
                Some(expense)
            }
            Err(e) => {
                prompter.notify(&e.to_string());
                None
            }
        }
    }

    pub fn delete(&mut self, id: &str, prompter: &mut dyn Prompter) -> bool {
        if !prompter.confirm(CONFIRM_DELETE) {
            return false;
        }
        self.repository.remove(id);
        self.changed();
        true
    }

    pub fn clear_all(&mut self, prompter: &mut dyn Prompter) -> bool {
        if !prompter.confirm(CONFIRM_CLEAR) {
            return false;
        }
        self.repository.clear();
        self.changed();
        true
    }

    pub fn set_month(&mut self, month: Option<String>) {
        self.filter.month = month.filter(|m| !m.is_empty());
        self.changed();
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
        self.changed();
    }

    pub fn cycle_month(&mut self) {
        let months = self.view().months;
        let next = match self.filter.month.as_deref() {
            None => months.first().cloned(),
            Some(current) => months
                .iter()
                .position(|m| m == current)
                .and_then(|i| months.get(i + 1).cloned()),
        };
        self.set_month(next);
    }

    pub fn export(&self, sink: &dyn ExportSink, prompter: &mut dyn Prompter) -> Result<Option<PathBuf>, String> {
        let view = self.view();
        export::export_csv(&view.filtered, sink, prompter)
    }

    fn changed(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let view = self.view();
        for listener in self.listeners.iter_mut() {
            listener(&view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::kv_store::MemoryStore;
    use crate::db::repository::STORAGE_KEY;
    use crate::operations::export::DirectorySink;
    use crate::prompt::ScriptedPrompter;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn create_test_tracker() -> Tracker<MemoryStore> {
        let repository = ExpenseRepository::open(MemoryStore::default());
        Tracker::new(repository, Config::default().categories)
    }

    fn add(tracker: &mut Tracker<MemoryStore>, description: &str, amount: &str, date: &str) -> Expense {
        let mut form =
            ExpenseForm::from_parts(tracker.categories(), description, amount, date, None).unwrap();
        tracker
            .submit(&mut form, &mut ScriptedPrompter::default())
            .unwrap()
    }

    #[test]
    fn test_submit_prepends_new_record() {
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        let second = add(&mut tracker, "Bus", "2", "2025-01-06");

        assert_eq!(tracker.expenses().len(), 2);
        assert_eq!(tracker.expenses()[0].id, second.id);
        assert_ne!(tracker.expenses()[0].id, tracker.expenses()[1].id);
    }

    #[test]
    fn test_submit_invalid_notifies_and_keeps_form() {
        let mut tracker = create_test_tracker();
        let mut form = tracker.new_form();
        form.description = "Coffee".to_string();
        form.amount = "0".to_string();
        form.date = "2025-01-05".to_string();
        let mut prompter = ScriptedPrompter::default();

        assert!(tracker.submit(&mut form, &mut prompter).is_none());
        assert!(tracker.expenses().is_empty());
        assert_eq!(prompter.notices.len(), 1);
        assert!(prompter.notices[0].contains("Invalid amount"));
        assert_eq!(form.description, "Coffee");
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut tracker = create_test_tracker();
        let expense = add(&mut tracker, "Coffee", "3.5", "2025-01-05");

        let mut decline = ScriptedPrompter::answering(&[false]);
        assert!(!tracker.delete(&expense.id, &mut decline));
        assert_eq!(tracker.expenses().len(), 1);
        assert_eq!(decline.questions, vec![CONFIRM_DELETE]);

        let mut accept = ScriptedPrompter::answering(&[true]);
        assert!(tracker.delete(&expense.id, &mut accept));
        assert!(tracker.expenses().is_empty());
    }

    #[test]
    fn test_delete_unknown_id_keeps_length() {
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");

        assert!(tracker.delete("missing", &mut ScriptedPrompter::answering(&[true])));
        assert_eq!(tracker.expenses().len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        add(&mut tracker, "Bus", "2", "2025-02-01");

        assert!(!tracker.clear_all(&mut ScriptedPrompter::answering(&[false])));
        assert_eq!(tracker.expenses().len(), 2);

        let mut accept = ScriptedPrompter::answering(&[true]);
        assert!(tracker.clear_all(&mut accept));
        assert!(tracker.expenses().is_empty());
        assert_eq!(accept.questions, vec![CONFIRM_CLEAR]);
        assert_eq!(tracker.repository.store().raw(STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_subscribers_see_recomputed_view() {
        let mut tracker = create_test_tracker();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        tracker.subscribe(move |view| sink.borrow_mut().push(view.summary.count));

        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        add(&mut tracker, "Bus", "2", "2025-02-01");
        tracker.set_month(Some("2025-02".to_string()));
        tracker.delete("missing", &mut ScriptedPrompter::answering(&[false]));

        assert_eq!(*seen.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn test_filters_drive_view() {
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        add(&mut tracker, "Bus", "2", "2025-02-01");

        tracker.set_search("coffee");
        let view = tracker.view();
        assert_eq!(view.filtered.len(), 1);
        assert_eq!(view.months, vec!["2025-02", "2025-01"]);

        tracker.set_search("");
        tracker.set_month(Some(String::new()));
        assert_eq!(tracker.filter().month, None);
        assert_eq!(tracker.view().filtered.len(), 2);
    }

    #[test]
    fn test_cycle_month() {
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        add(&mut tracker, "Bus", "2", "2025-02-01");

        tracker.cycle_month();
        assert_eq!(tracker.filter().month.as_deref(), Some("2025-02"));
        tracker.cycle_month();
        assert_eq!(tracker.filter().month.as_deref(), Some("2025-01"));
        tracker.cycle_month();
        assert_eq!(tracker.filter().month, None);
    }

    #[test]
    fn test_export_uses_filtered_records() {
        let dir = tempdir().unwrap();
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        add(&mut tracker, "Bus", "2", "2025-02-01");
        tracker.set_month(Some("2025-01".to_string()));

        let path = tracker
            .export(&DirectorySink::new(dir.path()), &mut ScriptedPrompter::default())
            .unwrap()
            .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"Coffee\""));
        assert!(!text.contains("\"Bus\""));
    }

    #[test]
    fn test_export_nothing_matching_notifies() {
        let dir = tempdir().unwrap();
        let mut tracker = create_test_tracker();
        add(&mut tracker, "Coffee", "3.5", "2025-01-05");
        tracker.set_search("zzz");
        let mut prompter = ScriptedPrompter::default();

        let result = tracker.export(&DirectorySink::new(dir.path()), &mut prompter).unwrap();
        assert!(result.is_none());
        assert_eq!(prompter.notices, vec!["No data to export"]);
    }
}
