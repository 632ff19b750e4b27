//! Splits the front matter into special variables, which steer the new
//! note's metadata, and custom variables, which the user is asked for.
use crate::config::{SPECIAL_VARIABLES, TMPL_VAR_FALLBACK_NOTE_TITLE};
use crate::error::NoteError;
use crate::front_matter::FrontMatter;
use handlebars::Template;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The front matter variables, sorted by role.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Classified {
    /// Special variable name to its (not yet rendered) template expression.
    /// Always contains `fallback_note_title`.
    pub special: BTreeMap<String, String>,
    /// Custom variable name to its declaration, in declaration order.
    pub custom: Map<String, Value>,
}

/// True when `name` can be referenced as `{{ name }}` in a template:
/// letters, digits and `_` only.
///
/// ```rust
/// use notetmpl_lib::classifier::is_valid_identifier;
///
/// assert!(is_valid_identifier("project_2"));
/// assert!(!is_valid_identifier("invalid@var"));
/// assert!(!is_valid_identifier("a b"));
/// assert!(!is_valid_identifier(""));
/// ```
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && Template::compile(&format!("{{{{ {name} }}}}")).is_ok()
}

/// Sorts the front matter variables. `fallback_title` (the template's own
/// title) is injected as `fallback_note_title`.
pub fn classify(front_matter: &FrontMatter, fallback_title: &str) -> Result<Classified, NoteError> {
    let mut classified = Classified::default();
    classified.special.insert(
        TMPL_VAR_FALLBACK_NOTE_TITLE.to_string(),
        fallback_title.to_string(),
    );

    for (name, value) in front_matter.iter() {
        if SPECIAL_VARIABLES.contains(&name.as_str()) {
            let Value::String(expr) = value else {
                return Err(NoteError::SpecialVariableNotString {
                    field_name: name.to_owned(),
                });
            };
            classified.special.insert(name.to_owned(), expr.to_owned());
        } else {
            if !is_valid_identifier(name) {
                return Err(NoteError::InvalidVariableName {
                    name: name.to_owned(),
                });
            }
            classified.custom.insert(name.to_owned(), value.to_owned());
        }
    }
    log::debug!(
        "Front matter: special variables {:?}, custom variables {:?}",
        classified.special.keys().collect::<Vec<_>>(),
        classified.custom.keys().collect::<Vec<_>>()
    );
    Ok(classified)
}
