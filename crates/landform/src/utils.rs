use anyhow::Context as _;
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a JSON parameter (or prior state) file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn read_optional_json<T: DeserializeOwned>(path: Option<&Path>) -> anyhow::Result<Option<T>> {
    path.map(read_json).transpose()
}

/// Print the resulting resource on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary on stderr, so stdout stays machine-readable
pub fn report(verb: &str, resource: &str, id: impl std::fmt::Display) {
    eprintln!(
        "{} {} {} {}",
        "✓".green().bold(),
        verb,
        resource,
        id.to_string().cyan()
    );
}
