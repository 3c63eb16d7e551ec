use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholder syntax: `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder pattern must compile")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw config text
///
/// Runs before deserialization so config structs hold plain values
/// (the API key usually arrives this way). Comment lines pass through
/// untouched, which lets an example config mention variables that are
/// not set.
pub fn expand_env(input: &str) -> anyhow::Result<String> {
    let expanded = input
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('#') {
                Ok(line.to_owned())
            } else {
                expand_line(line)
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(expanded.join("\n"))
}

fn expand_line(line: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    for caps in placeholder().captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&line[cursor..whole.start()]);
        out.push_str(&resolve(&caps)?);
        cursor = whole.end();
    }

    out.push_str(&line[cursor..]);
    Ok(out)
}

fn resolve(caps: &Captures<'_>) -> anyhow::Result<String> {
    let key = caps.get(1).map_or("", |m| m.as_str());
    let fallback = caps.get(2).map(|m| m.as_str());

    let Some(var) = key.strip_prefix("env.").filter(|v| !v.is_empty() && !v.contains('.')) else {
        anyhow::bail!("unsupported placeholder `{key}`: only `env.` variables can be expanded");
    };

    match (std::env::var(var), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => anyhow::bail!("environment variable `{var}` is not set"),
    }
}
