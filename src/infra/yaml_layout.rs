//! Format-preserving rewrites of the series document.
//!
//! The persisted text is cut into top-level member blocks. On write only the
//! `libraries` and `series` blocks are regenerated; every other block keeps its
//! exact bytes, comments included.

use serde_yaml::{Mapping, Value as YamlValue};

use crate::domain::document::{LIBRARIES_KEY, SERIES_KEY, SeriesDocument};

/// Members regenerated on every write.
const REWRITTEN_MEMBERS: &[&str] = &[LIBRARIES_KEY, SERIES_KEY];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    /// Top-level key, `None` for the preamble before the first key.
    key: Option<String>,
    /// Column-zero comments and blank lines directly above the key line.
    leading: String,
    body: String,
}

/// Render `document`, reusing the layout of `previous` where it is untouched.
///
/// Falls back to a plain full rendering when the previous text cannot be
/// spliced faithfully (flow-style roots, multiple documents, anchors shared
/// across members).
pub fn render(
    document: &SeriesDocument,
    previous: Option<&str>,
) -> Result<String, serde_yaml::Error> {
    let Some(previous) = previous.filter(|text| !text.trim().is_empty()) else {
        return render_full(document);
    };

    let spliced = splice(document, previous)?;
    match serde_yaml::from_str::<YamlValue>(&spliced) {
        Ok(parsed) if parsed == YamlValue::Mapping(document.root().clone()) => Ok(spliced),
        _ => render_full(document),
    }
}

fn render_full(document: &SeriesDocument) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(document.root())
}

fn splice(document: &SeriesDocument, previous: &str) -> Result<String, serde_yaml::Error> {
    let blocks = split_blocks(previous);
    let mut output = String::with_capacity(previous.len());
    let mut written = Vec::new();

    for block in &blocks {
        output.push_str(&block.leading);
        match block.key.as_deref() {
            Some(key) if REWRITTEN_MEMBERS.contains(&key) => {
                if written.contains(&key) {
                    // Duplicate keys collapse into the first occurrence.
                    continue;
                }
                output.push_str(&render_member(document, key)?);
                written.push(key);
            }
            _ => {
                output.push_str(&block.body);
                ensure_newline(&mut output);
            }
        }
    }

    for key in REWRITTEN_MEMBERS {
        if !written.contains(key) {
            ensure_newline(&mut output);
            output.push_str(&render_member(document, key)?);
        }
    }

    Ok(output)
}

fn render_member(document: &SeriesDocument, key: &str) -> Result<String, serde_yaml::Error> {
    let value = document
        .root()
        .get(key)
        .cloned()
        .unwrap_or_else(|| YamlValue::Mapping(Mapping::new()));
    let mut member = Mapping::new();
    member.insert(YamlValue::String(key.to_string()), value);
    serde_yaml::to_string(&member)
}

fn ensure_newline(output: &mut String) {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
}

fn split_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let key_lines: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| top_level_key(line).map(|key| (index, key)))
        .collect();

    let mut blocks = Vec::with_capacity(key_lines.len() + 1);
    let mut cursor = 0;

    for (position, (line_index, key)) in key_lines.iter().enumerate() {
        // Header comments directly above a key travel with it.
        let mut start = *line_index;
        while start > cursor && is_detached_line(lines[start - 1]) {
            start -= 1;
        }

        if start > cursor {
            match blocks.last_mut() {
                Some(Block { body, .. }) => body.push_str(&lines[cursor..start].concat()),
                None => blocks.push(Block {
                    key: None,
                    leading: String::new(),
                    body: lines[cursor..start].concat(),
                }),
            }
        }

        let end = key_lines
            .get(position + 1)
            .map(|(next, _)| *next)
            .unwrap_or(lines.len());
        let mut body_end = end;
        while body_end > line_index + 1 && is_detached_line(lines[body_end - 1]) {
            body_end -= 1;
        }

        blocks.push(Block {
            key: Some(key.clone()),
            leading: lines[start..*line_index].concat(),
            body: lines[*line_index..body_end].concat(),
        });
        cursor = body_end;
    }

    // Trailing comments stay put even when the last member is regenerated.
    if cursor < lines.len() {
        blocks.push(Block {
            key: None,
            leading: String::new(),
            body: lines[cursor..].concat(),
        });
    }

    blocks
}

/// Blank lines and column-zero comments.
fn is_detached_line(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// The key of a column-zero `key:` line.
fn top_level_key(line: &str) -> Option<String> {
    let first = line.chars().next()?;
    if first.is_whitespace() || matches!(first, '#' | '-' | '%' | '.' | '{' | '[' | '?') {
        return None;
    }

    let line = line.trim_end();
    let (raw_key, rest) = match first {
        '"' | '\'' => {
            let close = line[1..].find(first)? + 1;
            (&line[1..close], &line[close + 1..])
        }
        _ => {
            let colon = line
                .match_indices(':')
                .map(|(index, _)| index)
                .find(|index| {
                    line[index + 1..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace)
                })?;
            (line[..colon].trim_end(), &line[colon..])
        }
    };

    rest.starts_with(':').then(|| raw_key.to_string())
}
