//! The mapping of variables a template is rendered with.
use crate::config::TMPL_VAR_BOWM;
use crate::config::TMPL_VAR_BOWS;
use crate::config::TMPL_VAR_DATE;
use crate::config::TMPL_VAR_DATETIME;
use crate::config::TMPL_VAR_FALLBACK_NOTE_TITLE;
use crate::config::TMPL_VAR_TIME;
use crate::datetime::DateAndTimeUtils;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::ops::DerefMut;

/// Tiny wrapper around a `serde_json::Map` holding the template variables.
/// Later insertions shadow earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context(Map<String, Value>);

impl Context {
    /// Constructor registering the built-in variables `date`, `time`,
    /// `datetime`, `bowm` and `bows`.
    ///
    /// ```rust
    /// use notetmpl_lib::context::Context;
    /// use notetmpl_lib::datetime::{DateAndTimeUtils, FixedClock};
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// let clock = Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap());
    /// let utils = DateAndTimeUtils::new("en_GB", "DD/MM/YYYY", "HH:mm", clock);
    /// let context = Context::from_builtins(&utils);
    ///
    /// assert_eq!(context.get("date"), Some(&json!("12/08/2021")));
    /// assert_eq!(context.get("time"), Some(&json!("17:04")));
    /// assert_eq!(context.get("datetime"), Some(&json!("12/08/2021 17:04")));
    /// assert_eq!(context.get("bowm"), Some(&json!("09/08/2021")));
    /// assert_eq!(context.get("bows"), Some(&json!("08/08/2021")));
    /// ```
    pub fn from_builtins(utils: &DateAndTimeUtils) -> Self {
        let mut ct = Map::new();
        let date_format = utils.date_format();
        ct.insert(
            TMPL_VAR_DATE.to_string(),
            Value::String(utils.current_time(Some(date_format))),
        );
        ct.insert(
            TMPL_VAR_TIME.to_string(),
            Value::String(utils.current_time(Some(utils.time_format()))),
        );
        ct.insert(
            TMPL_VAR_DATETIME.to_string(),
            Value::String(utils.current_time(None)),
        );
        ct.insert(
            TMPL_VAR_BOWM.to_string(),
            Value::String(utils.format(utils.beginning_of_week(1), Some(date_format))),
        );
        ct.insert(
            TMPL_VAR_BOWS.to_string(),
            Value::String(utils.format(utils.beginning_of_week(0), Some(date_format))),
        );
        Self(ct)
    }

    /// Inserts the values of custom variables.
    pub fn insert_values(&mut self, values: &Map<String, Value>) {
        for (k, v) in values {
            self.0.insert(k.to_owned(), v.to_owned());
        }
    }

    /// Inserts resolved special variables. `fallback_note_title` is
    /// skipped.
    pub fn insert_special(&mut self, special: &BTreeMap<String, String>) {
        for (k, v) in special {
            if k == TMPL_VAR_FALLBACK_NOTE_TITLE {
                continue;
            }
            self.0.insert(k.to_owned(), Value::String(v.to_owned()));
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Context {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Context {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
