//! Set configuration defaults and reserved names.
//!
//! The defaults live in `config_default.toml` and are compiled into the
//! library. A host application reads its own settings (locale, date and time
//! formats, template notebook ...) and hands them over as TOML, which is
//! merged over the defaults:
//!
//! ```rust
//! use notetmpl_lib::config::LibCfg;
//!
//! let cfg = LibCfg::from_toml("[date_time]\ndate_format = \"YYYY-MM-DD\"").unwrap();
//! assert_eq!(cfg.date_time.date_format, "YYYY-MM-DD");
//! // Not mentioned keys keep their default.
//! assert_eq!(cfg.date_time.time_format, "HH:mm");
//! ```
use crate::error::LibCfgError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default library configuration as TOML.
pub const LIB_CONFIG_DEFAULT_TOML: &str = include_str!("config_default.toml");

/// Front matter key: the new note's title. The value is a template.
pub const TMPL_VAR_TEMPLATE_TITLE: &str = "template_title";

/// Front matter key: comma separated list of tags. The value is a template.
pub const TMPL_VAR_TEMPLATE_TAGS: &str = "template_tags";

/// Front matter key: ID of the notebook the note is created in. The value is
/// a template.
pub const TMPL_VAR_TEMPLATE_NOTEBOOK: &str = "template_notebook";

/// Front matter key: prefix `P` turning the title into `P-<n>: <title>`, where
/// `n` is one more than the highest `n` found among existing note titles.
pub const TMPL_VAR_TEMPLATE_AUTO_INCREMENTED_PREFIX: &str = "template_auto_incremented_prefix";

/// Injected special variable holding the template's own title. It seeds the
/// title derivation and never reaches the rendered body.
pub const TMPL_VAR_FALLBACK_NOTE_TITLE: &str = "fallback_note_title";

/// Special variables a template author can write into the front matter.
/// Their values are always quoted by the preprocessor.
pub const SPECIAL_VARIABLES: [&str; 4] = [
    TMPL_VAR_TEMPLATE_TITLE,
    TMPL_VAR_TEMPLATE_TAGS,
    TMPL_VAR_TEMPLATE_NOTEBOOK,
    TMPL_VAR_TEMPLATE_AUTO_INCREMENTED_PREFIX,
];

/// Built-in: current date in the configured date format.
pub const TMPL_VAR_DATE: &str = "date";

/// Built-in: current time in the configured time format.
pub const TMPL_VAR_TIME: &str = "time";

/// Built-in: current date and time, `<date format> <time format>`.
pub const TMPL_VAR_DATETIME: &str = "datetime";

/// Built-in: beginning of the week, weeks starting on Monday.
pub const TMPL_VAR_BOWM: &str = "bowm";

/// Built-in: beginning of the week, weeks starting on Sunday.
pub const TMPL_VAR_BOWS: &str = "bows";

/// Injected into every iteration of a `repeat` block, counting from 0.
pub const TMPL_VAR_REPEAT_INDEX: &str = "repeat_index";

/// Filename of the diagnostics log inside the profile directory.
pub const LOG_FILENAME: &str = "templates-logs.txt";

/// Configuration data, deserialized from the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibCfg {
    pub date_time: DateTimeCfg,
    pub templates: TemplatesCfg,
    pub default_templates: DefaultTemplatesCfg,
}

/// Locale and formats used by built-ins, helpers and date/time variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeCfg {
    pub locale: String,
    pub date_format: String,
    pub time_format: String,
}

/// Where templates are found and how they are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesCfg {
    pub tag: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub apply_tags_while_inserting: bool,
}

/// Default templates, globally and per notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultTemplatesCfg {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub todo: Option<String>,
    #[serde(default)]
    pub notebooks: BTreeMap<String, NotebookDefaults>,
}

/// Default templates of one notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookDefaults {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub todo: Option<String>,
}

/// Kind of note a default template is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    Note,
    Todo,
}

impl Default for LibCfg {
    /// Parses the embedded `config_default.toml`.
    fn default() -> Self {
        // The embedded file is tested in `test_default_config`.
        toml::from_str(LIB_CONFIG_DEFAULT_TOML).unwrap_or_else(|e| {
            panic!("embedded default configuration is invalid: {e}");
        })
    }
}

impl LibCfg {
    /// Merges the user's TOML document over the defaults. Tables are merged
    /// recursively, all other values replace the default.
    pub fn from_toml(user: &str) -> Result<Self, LibCfgError> {
        let mut base: toml::Value = toml::from_str(LIB_CONFIG_DEFAULT_TOML)?;
        let user: toml::Value = toml::from_str(user)?;
        merge_toml_values(&mut base, user);
        let cfg: LibCfg = base.try_into()?;
        cfg.assert_validity()?;
        log::trace!("Library configuration:\n{:#?}", cfg);
        Ok(cfg)
    }

    /// Perform some semantic consistency checks.
    /// * The date format must not be empty.
    /// * The time format must not be empty.
    /// * The template tag must not be empty.
    pub fn assert_validity(&self) -> Result<(), LibCfgError> {
        for (var, value) in [
            ("date_time.date_format", &self.date_time.date_format),
            ("date_time.time_format", &self.date_time.time_format),
            ("templates.tag", &self.templates.tag),
        ] {
            if value.trim().is_empty() {
                return Err(LibCfgError::EmptyValue {
                    var: var.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Template ID registered as default for `kind`: the notebook's own
    /// default first, then the global one.
    pub fn default_template_id(&self, kind: DefaultKind, folder_id: Option<&str>) -> Option<&str> {
        fn pick<'a>(
            kind: DefaultKind,
            note: &'a Option<String>,
            todo: &'a Option<String>,
        ) -> Option<&'a str> {
            match kind {
                DefaultKind::Note => note.as_deref(),
                DefaultKind::Todo => todo.as_deref(),
            }
            .filter(|id| !id.is_empty())
        }
        folder_id
            .and_then(|id| self.default_templates.notebooks.get(id))
            .and_then(|nb| pick(kind, &nb.note, &nb.todo))
            .or_else(|| {
                pick(
                    kind,
                    &self.default_templates.note,
                    &self.default_templates.todo,
                )
            })
    }
}

/// Merges `right` into `left`. Tables are merged key by key, everything else
/// in `right` replaces the value in `left`.
fn merge_toml_values(left: &mut toml::Value, right: toml::Value) {
    match (left, right) {
        (toml::Value::Table(l), toml::Value::Table(r)) => {
            for (k, rv) in r {
                match l.get_mut(&k) {
                    Some(lv) => merge_toml_values(lv, rv),
                    None => {
                        l.insert(k, rv);
                    }
                }
            }
        }
        (l, r) => *l = r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = LibCfg::default();
        assert_eq!(cfg.date_time.locale, "en_GB");
        assert_eq!(cfg.date_time.date_format, "DD/MM/YYYY");
        assert_eq!(cfg.date_time.time_format, "HH:mm");
        assert_eq!(cfg.templates.tag, "template");
        assert_eq!(cfg.templates.folder_id, None);
        assert!(cfg.templates.apply_tags_while_inserting);
        assert!(cfg.default_templates.notebooks.is_empty());
        assert!(cfg.assert_validity().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let cfg = LibCfg::from_toml(
            "[date_time]\n\
             time_format = \"h:mm A\"\n\
             [templates]\n\
             folder_id = \"abc\"\n",
        )
        .unwrap();
        assert_eq!(cfg.date_time.time_format, "h:mm A");
        assert_eq!(cfg.date_time.date_format, "DD/MM/YYYY");
        assert_eq!(cfg.templates.folder_id.as_deref(), Some("abc"));
        assert_eq!(cfg.templates.tag, "template");

        let err = LibCfg::from_toml("[date_time]\ndate_format = \" \"").unwrap_err();
        assert!(matches!(err, LibCfgError::EmptyValue { .. }));
        assert!(err.to_string().contains("date_time.date_format"));

        assert!(matches!(
            LibCfg::from_toml("[date_time"),
            Err(LibCfgError::Deserialize(_))
        ));
    }

    #[test]
    fn test_default_template_id() {
        let cfg = LibCfg::from_toml(
            "[default_templates]\n\
             note = \"global-note\"\n\
             [default_templates.notebooks.nb1]\n\
             note = \"nb1-note\"\n\
             todo = \"nb1-todo\"\n\
             [default_templates.notebooks.nb2]\n\
             todo = \"\"\n",
        )
        .unwrap();
        assert_eq!(
            cfg.default_template_id(DefaultKind::Note, Some("nb1")),
            Some("nb1-note")
        );
        assert_eq!(
            cfg.default_template_id(DefaultKind::Todo, Some("nb1")),
            Some("nb1-todo")
        );
        assert_eq!(
            cfg.default_template_id(DefaultKind::Note, Some("nb2")),
            Some("global-note")
        );
        assert_eq!(cfg.default_template_id(DefaultKind::Todo, Some("nb2")), None);
        assert_eq!(
            cfg.default_template_id(DefaultKind::Note, None),
            Some("global-note")
        );
    }
}
