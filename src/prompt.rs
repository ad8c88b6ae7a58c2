use std::io::{self, Write};

pub trait Prompter {
    fn confirm(&mut self, message: &str) -> bool;
    fn notify(&mut self, message: &str);
}

pub struct StdinPrompter {
    assume_yes: bool,
}

impl StdinPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} [y/N]: ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        match read_user_input() {
            Ok(answer) => is_yes(&answer),
            Err(e) => {
                println!("Error reading input: {}", e);
                false
            }
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}

fn read_user_input() -> Result<String, String> {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|_| "Failed to read line".to_string())?;
    Ok(input.trim().to_string())
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
pub use fake::ScriptedPrompter;
