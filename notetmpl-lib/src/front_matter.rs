//! Creates a memory representation of the template's YAML header.
//! In this documentation, the terms “YAML header”, ”header” and ”front matter"
//! are used as synonyms for the variable declarations at the beginning
//! of the template. Technically this is a wrapper around a `serde_json::Map`.
use crate::config::SPECIAL_VARIABLES;
use crate::content::locate_front_matter;
use crate::error::NoteError;
use crate::error::FRONT_MATTER_ERROR_MAX_LINES;
use serde_json::{Map, Value};
use std::ops::Deref;
use std::ops::DerefMut;

#[derive(Debug, Default, Eq, PartialEq)]
/// Represents the front matter of the template. This is a newtype
/// for `serde_json::Map<String, serde_json::Value>`, keys in declaration
/// order.
pub struct FrontMatter(pub Map<String, Value>);

/// Numbered lines for error messages.
fn excerpt(header: &str) -> String {
    header
        .lines()
        .enumerate()
        .map(|(n, s)| format!("{:03}: {}\n", n + 1, s))
        .take(FRONT_MATTER_ERROR_MAX_LINES)
        .collect::<String>()
}

impl TryFrom<&str> for FrontMatter {
    type Error = NoteError;
    /// Helper function deserializing the front matter of the template.
    /// An empty header leads to an empty map; no error.
    fn try_from(header: &str) -> Result<FrontMatter, NoteError> {
        let value: Value =
            serde_yaml::from_str(header).map_err(|e| NoteError::InvalidFrontMatterYaml {
                front_matter: excerpt(header),
                source_error: e,
            })?;
        match value {
            Value::Object(map) => Ok(FrontMatter(map)),
            Value::Null => Ok(FrontMatter::default()),
            _ => Err(NoteError::FrontMatterNotMapping {
                front_matter: excerpt(header),
            }),
        }
    }
}

/// Auto dereferences for convenient access to `serde_json::Map`.
impl Deref for FrontMatter {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Auto dereferences for convenient access to `serde_json::Map`.
impl DerefMut for FrontMatter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Wraps the values of the special variables `template_title`,
/// `template_tags`, `template_notebook` and
/// `template_auto_incremented_prefix` in double quotes, so that template
/// expressions like `{{ a }}: {{ b }}` are read as one string. Values
/// already in single or double quotes and empty values are left alone.
/// Only lines inside the front matter are touched.
///
/// ```rust
/// use notetmpl_lib::front_matter::quote_special_variables;
///
/// let input = "---\ntemplate_title: {{ project }}: {{ date }}\nproject: text\n---\n\
///              template_title: body text";
/// assert_eq!(
///     quote_special_variables(input),
///     "---\ntemplate_title: \"{{ project }}: {{ date }}\"\nproject: text\n---\n\
///      template_title: body text"
/// );
/// ```
pub fn quote_special_variables(input: &str) -> String {
    let Some(span) = locate_front_matter(input) else {
        return input.to_string();
    };
    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..span.header.start]);
    for line in input[span.header.clone()].split_inclusive('\n') {
        out.push_str(&quote_line(line));
    }
    out.push_str(&input[span.header.end..]);
    out
}

/// Quotes the value of a special variable line. Other lines are returned
/// unchanged.
fn quote_line(line: &str) -> String {
    let content = line.trim_end_matches(['\n', '\r']);
    let eol = &line[content.len()..];

    for key in SPECIAL_VARIABLES {
        let Some(rest) = content.strip_prefix(key) else {
            continue;
        };
        let Some(value) = rest.trim_start_matches([' ', '\t']).strip_prefix(':') else {
            continue;
        };
        if !value.is_empty() && !value.starts_with([' ', '\t']) {
            // Another key with the same prefix, e.g. `template_titles:`.
            continue;
        }
        let value = value.trim();
        let is_quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if value.is_empty() || is_quoted {
            return line.to_string();
        }
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        log::trace!("Quoting special variable `{}`", key);
        return format!("{key}: \"{escaped}\"{eol}");
    }
    line.to_string()
}
