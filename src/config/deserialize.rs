// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Rejects empty catalog version lists and malformed terminal commands.

use nonempty::NonEmpty;
use serde::Deserialize;

pub fn deserialize_versions<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<String> = Vec::deserialize(deserializer)?;
    let values = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one version is required"))
}

/// Accepts either a list (`["kitty", "-e"]`) or a whitespace-separated string.
pub fn deserialize_command<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entry: Option<CommandEntry> = Option::deserialize(deserializer)?;
    let argv = match entry {
        None => return Ok(None),
        Some(CommandEntry::Line(line)) => line.split_whitespace().map(str::to_string).collect(),
        Some(CommandEntry::Argv(argv)) => argv,
    };
    if argv.is_empty() {
        return Err(serde::de::Error::custom("terminal command cannot be empty"));
    }
    Ok(Some(argv))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandEntry {
    Line(String),
    Argv(Vec<String>),
}
