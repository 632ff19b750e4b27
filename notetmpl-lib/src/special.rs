//! Derives the new note's title, tags and notebook from the special
//! variables.
use crate::config::{
    TMPL_VAR_FALLBACK_NOTE_TITLE, TMPL_VAR_TEMPLATE_AUTO_INCREMENTED_PREFIX,
    TMPL_VAR_TEMPLATE_NOTEBOOK, TMPL_VAR_TEMPLATE_TAGS, TMPL_VAR_TEMPLATE_TITLE,
};
use crate::error::NoteError;
use crate::helpers::TemplateEngine;
use crate::host::{fetch_all, NoteStore};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything about the new note except its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteMetadata {
    pub title: String,
    pub tags: Vec<String>,
    pub folder: Option<String>,
}

/// Extracts `N` from a title `<prefix>-<N>: ...`.
fn numbered_suffix(title: &str, prefix: &str) -> Option<u64> {
    let rest = title.strip_prefix(prefix)?.strip_prefix('-')?;
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || !rest[digits..].starts_with(": ") {
        return None;
    }
    rest[..digits].parse().ok()
}

/// Splits a comma separated tag list. Empty tags are dropped.
///
/// ```rust
/// use notetmpl_lib::special::split_tags;
///
/// assert_eq!(split_tags("books, , finished,"), ["books", "finished"]);
/// assert!(split_tags("  ").is_empty());
/// ```
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct SpecialVariableResolver<'a> {
    engine: &'a TemplateEngine,
    store: &'a dyn NoteStore,
}

impl<'a> SpecialVariableResolver<'a> {
    pub fn new(engine: &'a TemplateEngine, store: &'a dyn NoteStore) -> Self {
        Self { engine, store }
    }

    /// Renders every special variable expression with `context`.
    pub fn render(
        &self,
        special: &BTreeMap<String, String>,
        context: &impl Serialize,
    ) -> Result<BTreeMap<String, String>, NoteError> {
        special
            .iter()
            .map(|(k, expr)| Ok::<_, NoteError>((k.to_owned(), self.engine.render(expr, context)?)))
            .collect()
    }

    /// The next number for `prefix`: one more than the highest `N` among
    /// note titles `<prefix>-<N>: ...`, 1 if there are none.
    pub fn next_number(&self, prefix: &str) -> Result<u64, NoteError> {
        let query = format!("title:\"{prefix}-*\"");
        let notes = fetch_all(|page| self.store.search_notes(&query, page))?;
        let max = notes
            .iter()
            .filter_map(|n| numbered_suffix(&n.title, prefix))
            .max()
            .unwrap_or(0);
        log::debug!(
            "Auto increment: {} notes found for `{}`, highest number {}",
            notes.len(),
            prefix,
            max
        );
        max.checked_add(1)
            .ok_or_else(|| NoteError::AutoIncrementOverflow {
                prefix: prefix.to_string(),
                max,
            })
    }

    /// Interprets the rendered special variables.
    pub fn resolve(&self, rendered: &BTreeMap<String, String>) -> Result<NoteMetadata, NoteError> {
        let get = |k: &str| rendered.get(k).map(String::as_str);

        let mut title = match get(TMPL_VAR_TEMPLATE_TITLE) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => get(TMPL_VAR_FALLBACK_NOTE_TITLE)
                .unwrap_or_default()
                .to_string(),
        };

        if let Some(prefix) = get(TMPL_VAR_TEMPLATE_AUTO_INCREMENTED_PREFIX) {
            let n = self.next_number(prefix)?;
            title = format!("{prefix}-{n}: {title}");
        }

        let tags = get(TMPL_VAR_TEMPLATE_TAGS)
            .map(split_tags)
            .unwrap_or_default();

        let folder = match get(TMPL_VAR_TEMPLATE_NOTEBOOK).map(str::trim) {
            Some(id) if !id.is_empty() => {
                if !self.store.folder_exists(id)? {
                    return Err(NoteError::NotebookNotFound { id: id.to_string() });
                }
                Some(id.to_string())
            }
            _ => None,
        };

        Ok(NoteMetadata {
            title,
            tags,
            folder,
        })
    }
}
