//! Custom variable types: how a front matter declaration becomes an input
//! control in the variables dialog, and how the user's answer becomes a
//! typed value.
//!
//! A declaration is either a bare type name or an object:
//!
//! ```yaml
//! name: text
//! count: number
//! status: dropdown(open, done)
//! due:
//!   type: date
//!   label: Due date
//!   default: 2021-08-12
//! ```
//!
//! ```rust
//! use notetmpl_lib::variable::{CustomVariable, VariableKind};
//! use serde_json::json;
//!
//! let v = CustomVariable::from_definition("status", &json!("dropdown(open, done)"));
//! assert_eq!(v.kind, VariableKind::Enum { options: vec!["open".into(), "done".into()] });
//!
//! // Every declaration yields a variable, unknown ones an invalid one.
//! let v = CustomVariable::from_definition("x", &json!("colour"));
//! assert_eq!(v.kind, VariableKind::Invalid);
//! ```
use crate::datetime::{add_duration, DateAndTimeUtils};
use crate::error::DateTimeError;
use crate::js_value::{number_value, parse_float_str, to_js_string};
use html_escape::encode_safe;
use serde_json::{Map, Value};
use time::Duration;

/// Date format of the native date control, accepted as fallback.
const ISO_DATE_FORMAT: &str = "YYYY-MM-DD";

/// What kind of value a custom variable holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    Text,
    Number,
    Boolean {
        /// Preselected answer.
        default: bool,
    },
    Date,
    Time,
    /// `dropdown(a, b)` or `enum(a, b)`.
    Enum { options: Vec<String> },
    /// Autocomplete over note titles. The answer is a note ID.
    Search {
        query: String,
        /// `(title, id)` pairs offered in the dialog.
        notes: Vec<(String, String)>,
    },
    /// Marks a declaration no type accepts.
    Invalid,
}

/// One front matter declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomVariable {
    pub name: String,
    pub label: String,
    /// Prefilled answer.
    pub default: Option<String>,
    pub kind: VariableKind,
}

type KindMatcher = fn(&str, &Value) -> Option<VariableKind>;

/// Variable types in the order they are tried. `Invalid` accepts anything
/// and comes last.
const VARIABLE_TYPES: [KindMatcher; 8] = [
    |t, _| (t == "text").then_some(VariableKind::Text),
    |t, _| (t == "number").then_some(VariableKind::Number),
    |t, def| {
        (t == "boolean").then(|| VariableKind::Boolean {
            default: boolean_default(def),
        })
    },
    |t, _| (t == "date").then_some(VariableKind::Date),
    |t, _| (t == "time").then_some(VariableKind::Time),
    |t, _| enum_options(t).map(|options| VariableKind::Enum { options }),
    |t, def| {
        (t == "search").then(|| VariableKind::Search {
            query: object_str(def, "query").unwrap_or_default(),
            notes: Vec::new(),
        })
    },
    |_, _| Some(VariableKind::Invalid),
];

/// The type name of a declaration, trimmed.
fn definition_type(def: &Value) -> Option<&str> {
    match def {
        Value::String(s) => Some(s.trim()),
        Value::Object(m) => m.get("type").and_then(Value::as_str).map(str::trim),
        _ => None,
    }
}

/// A trimmed string field of an object declaration.
fn object_str(def: &Value, key: &str) -> Option<String> {
    def.as_object()
        .and_then(|m: &Map<String, Value>| m.get(key))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

/// `yes` and `true` are true, `no` and `false` are false, ignoring case.
/// Everything else, including no default, is true.
fn boolean_default(def: &Value) -> bool {
    match def.as_object().and_then(|m| m.get("default")) {
        Some(Value::Bool(b)) => *b,
        Some(v) => !matches!(
            to_js_string(v).trim().to_lowercase().as_str(),
            "no" | "false"
        ),
        None => true,
    }
}

/// Options of `dropdown(a, b)` or `enum(a, b)`.
fn enum_options(t: &str) -> Option<Vec<String>> {
    let inner = t
        .strip_prefix("dropdown(")
        .or_else(|| t.strip_prefix("enum("))?
        .strip_suffix(')')?;
    Some(inner.split(',').map(|o| o.trim().to_string()).collect())
}

impl CustomVariable {
    /// Builds the variable of the first type accepting `definition`.
    pub fn from_definition(name: &str, definition: &Value) -> Self {
        let kind = match definition_type(definition) {
            Some(t) => VARIABLE_TYPES
                .iter()
                .find_map(|matcher| matcher(t, definition))
                .unwrap_or(VariableKind::Invalid),
            None => VariableKind::Invalid,
        };
        let label = object_str(definition, "label").unwrap_or_else(|| name.to_string());
        let default = match definition.as_object().and_then(|m| m.get("default")) {
            None | Some(Value::Null) => None,
            Some(v) => Some(to_js_string(v)),
        };
        log::trace!("Variable `{}` declared as {:?}", name, kind);
        CustomVariable {
            name: name.to_string(),
            label,
            default,
            kind,
        }
    }

    /// The search query of a search variable.
    pub fn search_query(&self) -> Option<&str> {
        match &self.kind {
            VariableKind::Search { query, .. } => Some(query),
            _ => None,
        }
    }

    /// Sets the notes offered by a search variable. No effect on other kinds.
    pub fn set_search_notes(&mut self, found: Vec<(String, String)>) {
        if let VariableKind::Search { notes, .. } = &mut self.kind {
            *notes = found;
        }
    }

    fn value_attr(&self) -> String {
        match &self.default {
            Some(d) => format!(" value=\"{}\"", encode_safe(d)),
            None => String::new(),
        }
    }

    /// The input control only.
    fn input_html(&self, date_format: &str) -> String {
        let name = encode_safe(&self.name);
        let label = encode_safe(&self.label);
        let value = self.value_attr();
        match &self.kind {
            VariableKind::Text => format!(
                r#"<input name="{name}" type="text" aria-label="{label}"{value}></input>"#
            ),
            VariableKind::Number => format!(
                r#"<input name="{name}" type="text" inputmode="decimal" pattern="-?[0-9]*\.?[0-9]*" placeholder="Enter a number"{value}></input>"#
            ),
            VariableKind::Boolean { default } => {
                let (yes, no) = if *default {
                    (" selected", "")
                } else {
                    ("", " selected")
                };
                format!(
                    r#"<select name="{name}" aria-label="{label}"><option value="true"{yes}>Yes</option><option value="false"{no}>No</option></select>"#
                )
            }
            VariableKind::Date => {
                let format = encode_safe(date_format);
                format!(
                    r#"<input name="{name}" type="text" data-datepicker-format="{format}" placeholder="{format}" autocomplete="off"{value}></input>"#
                )
            }
            VariableKind::Time => format!(
                r#"<input name="{name}" type="time" aria-label="{label}"{value}></input>"#
            ),
            VariableKind::Enum { options } => {
                let options: String = options
                    .iter()
                    .map(|o| {
                        let selected = if self.default.as_deref() == Some(o.as_str()) {
                            " selected"
                        } else {
                            ""
                        };
                        let o = encode_safe(o);
                        format!(r#"<option value="{o}"{selected}>{o}</option>"#)
                    })
                    .collect();
                format!(r#"<select name="{name}">{options}</select>"#)
            }
            VariableKind::Search { notes, .. } => {
                let mut title_to_id = Map::new();
                let mut datalist = String::new();
                for (title, id) in notes {
                    title_to_id.insert(title.clone(), Value::String(id.clone()));
                    datalist.push_str(&format!(r#"<option value="{}">"#, encode_safe(title)));
                }
                let notes_map = Value::Object(title_to_id).to_string().replace('\'', "&#39;");
                format!(
                    r#"<div class="search-variable-container"><input type="text" class="search-datalist-input" list="datalist-{name}" placeholder="Type to search notes..." data-notes-map='{notes_map}' data-hidden-id="{name}" autocomplete="off" /><input type="hidden" name="{name}" id="{name}" value="" /><datalist id="datalist-{name}">{datalist}</datalist></div>"#
                )
            }
            VariableKind::Invalid => String::new(),
        }
    }

    /// The labeled control shown in the variables dialog.
    ///
    /// ```rust
    /// use notetmpl_lib::variable::CustomVariable;
    /// use serde_json::json;
    ///
    /// let v = CustomVariable::from_definition("x", &json!({"type": "text", "label": "<X>"}));
    /// assert_eq!(
    ///     v.to_html("DD/MM/YYYY"),
    ///     "<div class=\"variableInput\"><div class=\"variableName\">&lt;X&gt;</div>\
    ///      <div><input name=\"x\" type=\"text\" aria-label=\"&lt;X&gt;\"></input></div></div>"
    /// );
    /// ```
    pub fn to_html(&self, date_format: &str) -> String {
        if self.kind == VariableKind::Invalid {
            return format!(
                r#"<div class="invalidVariable"><i>{} has an invalid type.</i></div>"#,
                encode_safe(&self.name)
            );
        }
        format!(
            r#"<div class="variableInput"><div class="variableName">{}</div><div>{}</div></div>"#,
            encode_safe(&self.label),
            self.input_html(date_format)
        )
    }

    /// Converts the user's answer. `None` for invalid variables: they have
    /// no value.
    pub fn coerce(
        &self,
        input: &str,
        utils: &DateAndTimeUtils,
    ) -> Result<Option<Value>, DateTimeError> {
        Ok(Some(match &self.kind {
            VariableKind::Text | VariableKind::Enum { .. } | VariableKind::Search { .. } => {
                Value::String(input.to_string())
            }
            VariableKind::Number => number_value(parse_float_str(input)),
            VariableKind::Boolean { .. } => Value::Bool(input == "true"),
            VariableKind::Date => {
                let format = utils.date_format();
                let date = utils
                    .parse(input, format)
                    .or_else(|e| utils.parse(input, ISO_DATE_FORMAT).map_err(|_| e))?;
                Value::String(utils.format(date, Some(format)))
            }
            VariableKind::Time => {
                let parse_err = || DateTimeError::Parse {
                    input: input.to_string(),
                    format: "HH:mm".to_string(),
                };
                let (hours, minutes) = input.split_once(':').ok_or_else(parse_err)?;
                let hours: i64 = hours.trim().parse().map_err(|_| parse_err())?;
                let minutes: i64 = minutes.trim().parse().map_err(|_| parse_err())?;
                // Like a wall clock: out of range values roll over.
                let now = utils.now();
                let millis = hours
                    .checked_mul(60)
                    .and_then(|m| m.checked_add(minutes))
                    .and_then(|m| m.checked_mul(60))
                    .and_then(|s| s.checked_add(now.second() as i64))
                    .and_then(|s| s.checked_mul(1000))
                    .and_then(|ms| ms.checked_add(now.millisecond() as i64))
                    .ok_or_else(parse_err)?;
                let t = add_duration(
                    now.replace_time(time::Time::MIDNIGHT),
                    Duration::milliseconds(millis),
                )
                .map_err(|_| parse_err())?;
                Value::String(utils.format(t, Some(utils.time_format())))
            }
            VariableKind::Invalid => return Ok(None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::FixedClock;
    use serde_json::json;
    use std::sync::Arc;

    fn utils(date_format: &str, time_format: &str) -> DateAndTimeUtils {
        DateAndTimeUtils::new(
            "en_GB",
            date_format,
            time_format,
            Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap()),
        )
    }

    #[test]
    fn test_registry() {
        for (def, kind) in [
            (json!("text"), VariableKind::Text),
            (json!(" number "), VariableKind::Number),
            (json!("boolean"), VariableKind::Boolean { default: true }),
            (json!("date"), VariableKind::Date),
            (json!({"type": "time"}), VariableKind::Time),
            (
                json!("dropdown(, finished, unfinished)"),
                VariableKind::Enum {
                    options: vec!["".into(), "finished".into(), "unfinished".into()],
                },
            ),
            (
                json!({"type": "enum(a,b)"}),
                VariableKind::Enum {
                    options: vec!["a".into(), "b".into()],
                },
            ),
            (
                json!({"type": "search", "query": " tag:x "}),
                VariableKind::Search {
                    query: "tag:x".into(),
                    notes: vec![],
                },
            ),
            (json!("search"), VariableKind::Search {
                query: "".into(),
                notes: vec![],
            }),
            // Malformed declarations.
            (json!("dropdown(a"), VariableKind::Invalid),
            (json!("Text"), VariableKind::Invalid),
            (json!(12), VariableKind::Invalid),
            (Value::Null, VariableKind::Invalid),
            (json!(["text"]), VariableKind::Invalid),
            (json!({"label": "no type"}), VariableKind::Invalid),
            (json!({"type": 3}), VariableKind::Invalid),
        ] {
            assert_eq!(CustomVariable::from_definition("v", &def).kind, kind, "{def}");
        }
    }

    #[test]
    fn test_label_and_default() {
        let v = CustomVariable::from_definition(
            "v",
            &json!({"type": "text", "label": "  Some label ", "default": 5}),
        );
        assert_eq!(v.label, "Some label");
        assert_eq!(v.default.as_deref(), Some("5"));

        let v = CustomVariable::from_definition("v", &json!("text"));
        assert_eq!(v.label, "v");
        assert_eq!(v.default, None);

        for (default, expected) in [
            (json!("yes"), true),
            (json!(" No "), false),
            (json!("FALSE"), false),
            (json!(false), false),
            (json!("maybe"), true),
        ] {
            let v = CustomVariable::from_definition(
                "v",
                &json!({"type": "boolean", "default": default}),
            );
            assert_eq!(v.kind, VariableKind::Boolean { default: expected }, "{default}");
        }
    }

    #[test]
    fn test_html() {
        let html = |def: Value| CustomVariable::from_definition("v", &def).to_html("DD/MM/YYYY");

        assert!(html(json!("number")).contains(
            r#"<input name="v" type="text" inputmode="decimal" pattern="-?[0-9]*\.?[0-9]*" placeholder="Enter a number"></input>"#
        ));
        assert!(html(json!({"type": "boolean", "default": "no"})).contains(
            r#"<option value="true">Yes</option><option value="false" selected>No</option>"#
        ));
        assert!(html(json!("date")).contains(
            r#"data-datepicker-format="DD&#x2F;MM&#x2F;YYYY""#
        ));
        assert!(html(json!("time")).contains(r#"type="time""#));
        assert!(html(json!({"type": "dropdown(a, b)", "default": "b"}))
            .contains(r#"<select name="v"><option value="a">a</option><option value="b" selected>b</option></select>"#));
        assert!(html(json!("dropdown()")).contains(r#"<select name="v"><option value=""></option></select>"#));
        assert_eq!(
            html(json!("nope")),
            r#"<div class="invalidVariable"><i>v has an invalid type.</i></div>"#
        );

        let mut v = CustomVariable::from_definition("v", &json!("search"));
        v.set_search_notes(vec![
            ("It's a note".to_string(), "id1".to_string()),
            ("Other".to_string(), "id2".to_string()),
        ]);
        let html = v.to_html("DD/MM/YYYY");
        assert!(html.contains(r#"data-notes-map='{"It&#39;s a note":"id1","Other":"id2"}'"#));
        assert!(html.contains(r#"<option value="It&#x27;s a note">"#));
        assert!(html.contains(r#"<input type="hidden" name="v" id="v" value="" />"#));
    }

    #[test]
    fn test_coerce() {
        let u = utils("DD.MM.YYYY", "HH.mm");
        let coerce = |def: Value, input: &str| {
            CustomVariable::from_definition("v", &def)
                .coerce(input, &u)
                .unwrap()
        };
        assert_eq!(coerce(json!("text"), "a b"), Some(json!("a b")));
        assert_eq!(coerce(json!("number"), "12"), Some(json!(12)));
        assert_eq!(coerce(json!("number"), "-1.5"), Some(json!(-1.5)));
        assert_eq!(coerce(json!("number"), "abc"), Some(json!("NaN")));
        assert_eq!(coerce(json!("boolean"), "true"), Some(json!(true)));
        assert_eq!(coerce(json!("boolean"), "True"), Some(json!(false)));
        assert_eq!(coerce(json!("dropdown(a, b)"), "b"), Some(json!("b")));
        assert_eq!(coerce(json!("search"), "id1"), Some(json!("id1")));
        assert_eq!(coerce(json!("date"), "09.05.2023"), Some(json!("09.05.2023")));
        // ISO fallback.
        assert_eq!(coerce(json!("date"), "2023-05-09"), Some(json!("09.05.2023")));
        assert_eq!(coerce(json!("time"), "17:25"), Some(json!("17.25")));
        assert_eq!(coerce(json!("time"), "24:05"), Some(json!("00.05")));
        assert_eq!(coerce(json!("nope"), "x"), None);

        let v = CustomVariable::from_definition("v", &json!("date"));
        let err = v.coerce("09/05/2023", &u).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Was not able to parse 09/05/2023 according to format DD.MM.YYYY"
        );
        let v = CustomVariable::from_definition("v", &json!("time"));
        assert!(v.coerce("", &u).is_err());
        for input in ["99999999:00", "0:99999999999", "-99999999:00"] {
            assert!(matches!(
                v.coerce(input, &u),
                Err(DateTimeError::Parse { .. })
            ));
        }
        assert!(matches!(
            v.coerce("9223372036854775807:00", &u),
            Err(DateTimeError::Parse { .. })
        ));
    }

    #[test]
    fn test_coerce_idempotent() {
        let u = utils("DD/MM/YYYY", "HH:mm");
        for (def, input) in [
            (json!("number"), "12"),
            (json!("boolean"), "true"),
            (json!("boolean"), "false"),
            (json!("date"), "12/08/2021"),
            (json!("text"), "x"),
        ] {
            let v = CustomVariable::from_definition("v", &def);
            let once = v.coerce(input, &u).unwrap().unwrap();
            let again = v
                .coerce(&crate::js_value::to_js_string(&once), &u)
                .unwrap()
                .unwrap();
            assert_eq!(once, again, "{def}");
        }
    }
}
