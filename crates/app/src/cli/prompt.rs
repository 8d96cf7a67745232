use std::io::{self, BufRead, IsTerminal, Write};

use zeroize::Zeroizing;

/// Read instead of prompting when set, for non-interactive use
pub const PASSWORD_ENV: &str = "ENVCRYPT_PASSWORD";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("passwords do not match")]
    Mismatch,
    #[error("password must not be empty")]
    Empty,
    #[error("confirmation required; pass --yes when not running in a terminal")]
    NotInteractive,
}

/// Password from `ENVCRYPT_PASSWORD`, else a hidden terminal prompt
pub fn password(prompt: &str) -> Result<Zeroizing<String>, PromptError> {
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => Zeroizing::new(password),
        Err(_) => Zeroizing::new(rpassword::prompt_password(prompt)?),
    };
    if password.is_empty() {
        return Err(PromptError::Empty);
    }
    Ok(password)
}

/// A new password, typed twice unless it came from the environment
pub fn new_password() -> Result<Zeroizing<String>, PromptError> {
    if std::env::var(PASSWORD_ENV).is_ok() {
        return password("");
    }
    let first = password("Choose a password: ")?;
    let second = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
    if *first != *second {
        return Err(PromptError::Mismatch);
    }
    Ok(first)
}

/// Ask a yes/no question on the terminal; anything but y/yes is a no
pub fn confirm(question: &str) -> Result<bool, PromptError> {
    if !io::stdin().is_terminal() {
        return Err(PromptError::NotInteractive);
    }
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
