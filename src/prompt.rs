//! Interactive input for values not given on the command line.

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, Input, Password};
use secrecy::SecretString;
use std::io::IsTerminal;

/// Use `value` when present, otherwise ask for it.
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(value) = value.map(|v| v.trim().to_string())
        && !value.is_empty()
    {
        return Ok(value);
    }
    ensure_interactive(prompt)?;

    let value: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))?;
    Ok(value.trim().to_string())
}

/// Use `value` when present, otherwise ask for it without echoing.
pub fn secret_or_prompt(value: Option<String>, prompt: &str) -> Result<SecretString> {
    if let Some(value) = value
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }
    ensure_interactive(prompt)?;

    let value = Password::new()
        .with_prompt(prompt)
        .interact()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))?;
    Ok(SecretString::from(value))
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    ensure_interactive(prompt)?;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}

fn ensure_interactive(prompt: &str) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        bail!("{prompt} is required; pass it as a flag or environment variable");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_given_value_is_used() {
        let value = value_or_prompt(Some("  acme ".to_string()), "Organization").unwrap();
        assert_eq!(value, "acme");
    }

    #[test]
    fn test_given_secret_is_used_verbatim() {
        let secret = secret_or_prompt(Some(" pa ss ".to_string()), "Password").unwrap();
        assert_eq!(secret.expose_secret(), " pa ss ");
    }
}
