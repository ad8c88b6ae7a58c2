use crate::models::expense::Expense;
use crate::prompt::Prompter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EXPORT_FILE_NAME: &str = "expenses.csv";
pub const EXPORT_HEADER: [&str; 4] = ["Description", "Amount", "Date", "Category"];

pub trait ExportSink {
    fn offer(&self, file_name: &str, contents: &str) -> Result<PathBuf, String>;
}

pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ExportSink for DirectorySink {
    fn offer(&self, file_name: &str, contents: &str) -> Result<PathBuf, String> {
        let path = self.dir.join(file_name);
        fs::write(&path, contents)
            .map_err(|e| format!("Failed to write file '{}': {}", path.display(), e))?;
        Ok(path)
    }
}

// Rows are joined by \n with no trailing newline.
pub fn csv_text(expenses: &[Expense]) -> Result<String, String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;
    for expense in expenses {
        let amount = expense.amount.normalize().to_string();
        let date = expense.iso_date();
        writer
            .write_record([
                expense.description.as_str(),
                amount.as_str(),
                date.as_str(),
                expense.category.as_str(),
            ])
            .map_err(|e| format!("Failed to write CSV row: {}", e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| format!("Failed to flush CSV: {}", e))?;
    let text = String::from_utf8(bytes).map_err(|e| format!("CSV is not valid UTF-8: {}", e))?;
    Ok(text.strip_suffix('\n').unwrap_or(&text).to_string())
}

pub fn export_csv(
    expenses: &[Expense],
    sink: &dyn ExportSink,
    prompter: &mut dyn Prompter,
) -> Result<Option<PathBuf>, String> {
    if expenses.is_empty() {
        prompter.notify("No data to export");
        return Ok(None);
    }
    let text = csv_text(expenses)?;
    let path = sink.offer(EXPORT_FILE_NAME, &text)?;
    debug!("Exported {} expenses to {}", expenses.len(), path.display());
    Ok(Some(path))
}
