//! Asks the user for the values of the custom variables.
use crate::datetime::DateAndTimeUtils;
use crate::error::NoteError;
use crate::host::{fetch_all, DialogHost, NoteStore, RawDialogResponse};
use crate::js_value::to_js_string;
use crate::variable::CustomVariable;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Dialog schema version understood here.
pub const DIALOG_SCHEMA_VERSION: u32 = 1;

/// Button ID confirming the dialog.
const BUTTON_OK: &str = "ok";

/// Button ID dismissing the dialog.
const BUTTON_CANCEL: &str = "cancel";

/// Validated answer of the variables dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResult {
    Cancel,
    /// Raw answer per variable name.
    Confirm(BTreeMap<String, String>),
}

impl TryFrom<&RawDialogResponse> for DialogResult {
    type Error = NoteError;

    fn try_from(raw: &RawDialogResponse) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| NoteError::MalformedDialogResponse {
            reason: reason.to_string(),
        };
        let version = raw.version.unwrap_or(DIALOG_SCHEMA_VERSION);
        if version != DIALOG_SCHEMA_VERSION {
            return Err(malformed(&format!("unsupported version {version}")));
        }
        match raw.id.as_str() {
            BUTTON_CANCEL => Ok(DialogResult::Cancel),
            BUTTON_OK => {
                let variables = raw
                    .form_data
                    .as_ref()
                    .and_then(|fd| fd.get("variables"))
                    .and_then(Value::as_object)
                    .ok_or_else(|| malformed("`formData.variables` is missing"))?;
                let mut answers = BTreeMap::new();
                for (name, v) in variables {
                    let answer = match v {
                        Value::String(s) => s.to_owned(),
                        Value::Number(_) | Value::Bool(_) => to_js_string(v),
                        _ => {
                            return Err(malformed(&format!(
                                "the answer for `{name}` is not a string"
                            )))
                        }
                    };
                    answers.insert(name.to_owned(), answer);
                }
                Ok(DialogResult::Confirm(answers))
            }
            other => Err(malformed(&format!("unknown button `{other}`"))),
        }
    }
}

/// Outcome of asking the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The user dismissed the dialog.
    Cancelled,
    /// Typed value per custom variable. Invalid variables have none.
    Resolved(Map<String, Value>),
}

/// Shows the variables dialog and converts the answers.
pub struct PromptResolver<'a> {
    dialog: &'a dyn DialogHost,
    store: &'a dyn NoteStore,
    utils: &'a DateAndTimeUtils,
}

impl<'a> PromptResolver<'a> {
    pub fn new(
        dialog: &'a dyn DialogHost,
        store: &'a dyn NoteStore,
        utils: &'a DateAndTimeUtils,
    ) -> Self {
        Self {
            dialog,
            store,
            utils,
        }
    }

    /// Builds the variables and fills search variables with the notes their
    /// query finds.
    fn variables(&self, custom: &Map<String, Value>) -> Result<Vec<CustomVariable>, NoteError> {
        let mut variables = Vec::with_capacity(custom.len());
        for (name, definition) in custom {
            let mut variable = CustomVariable::from_definition(name, definition);
            if let Some(query) = variable.search_query() {
                let notes = fetch_all(|page| self.store.search_notes(query, page))?;
                variable.set_search_notes(notes.into_iter().map(|n| (n.title, n.id)).collect());
            }
            variables.push(variable);
        }
        Ok(variables)
    }

    /// The dialog's form.
    pub fn form_html(&self, variables: &[CustomVariable]) -> String {
        let inputs: String = variables
            .iter()
            .map(|v| v.to_html(self.utils.date_format()))
            .collect();
        format!(
            "<h2>Template variables</h2>\
             <form class=\"variablesForm\" name=\"variables\">{inputs}</form>"
        )
    }

    /// Asks for the custom variables of the template `template_title`.
    /// Without custom variables, no dialog is shown.
    pub fn resolve(
        &self,
        template_title: &str,
        custom: &Map<String, Value>,
    ) -> Result<Resolution, NoteError> {
        if custom.is_empty() {
            return Ok(Resolution::Resolved(Map::new()));
        }
        let variables = self.variables(custom)?;
        let html = self.form_html(&variables);
        let raw = self.dialog.open_variables_dialog(template_title, &html)?;

        let answers = match DialogResult::try_from(&raw) {
            Ok(DialogResult::Cancel) => {
                log::debug!("Variables dialog cancelled.");
                return Ok(Resolution::Cancelled);
            }
            Ok(DialogResult::Confirm(answers)) => answers,
            Err(e) => {
                log::error!(
                    "{}\n\
                     Template: {}\n\
                     Variables: {}\n\
                     Dialog response: {}",
                    e,
                    template_title,
                    Value::Object(custom.to_owned()),
                    serde_json::to_string(&raw).unwrap_or_else(|_| format!("{:?}", raw)),
                );
                return Err(e);
            }
        };

        let mut values = Map::new();
        for variable in &variables {
            let answer = answers
                .get(&variable.name)
                .map(String::as_str)
                .unwrap_or_default();
            if let Some(v) = variable.coerce(answer, self.utils)? {
                values.insert(variable.name.to_owned(), v);
            }
        }
        log::trace!("Custom variable values: {:?}", values);
        Ok(Resolution::Resolved(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::FixedClock;
    use crate::error::HostError;
    use crate::host::{Note, Page, Tag};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::Arc;

    /// Keeps every record's level and message.
    struct CaptureLogger(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.0
                .lock()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static CAPTURED: CaptureLogger = CaptureLogger(parking_lot::const_mutex(Vec::new()));

    /// Records logged so far that mention `needle`.
    fn captured(needle: &str) -> Vec<(log::Level, String)> {
        CAPTURED
            .0
            .lock()
            .iter()
            .filter(|(_, msg)| msg.contains(needle))
            .cloned()
            .collect()
    }

    struct FakeDialog {
        response: RawDialogResponse,
        shown: RefCell<Vec<String>>,
    }

    impl DialogHost for FakeDialog {
        fn open_variables_dialog(
            &self,
            _title: &str,
            html: &str,
        ) -> Result<RawDialogResponse, HostError> {
            self.shown.borrow_mut().push(html.to_string());
            Ok(self.response.clone())
        }

        fn show_message(&self, _msg: &str) {}
    }

    struct FakeStore;

    impl NoteStore for FakeStore {
        fn get_note(&self, id: &str) -> Result<Note, HostError> {
            Err(HostError::NotFound { id: id.to_string() })
        }
        fn search_notes(&self, _query: &str, page: u32) -> Result<Page<Note>, HostError> {
            Ok(Page {
                items: vec![Note {
                    id: format!("id{page}"),
                    title: format!("Note {page}"),
                    body: String::new(),
                }],
                has_more: page < 2,
            })
        }
        fn folder_exists(&self, _folder_id: &str) -> Result<bool, HostError> {
            Ok(true)
        }
        fn notes_in_folder(&self, _folder_id: &str, _page: u32) -> Result<Page<Note>, HostError> {
            Ok(Page { items: vec![], has_more: false })
        }
        fn notes_with_tag(&self, _tag_id: &str, _page: u32) -> Result<Page<Note>, HostError> {
            Ok(Page { items: vec![], has_more: false })
        }
        fn find_tag(&self, _title: &str) -> Result<Option<Tag>, HostError> {
            Ok(None)
        }
        fn create_tag(&self, title: &str) -> Result<Tag, HostError> {
            Ok(Tag { id: title.to_string(), title: title.to_string() })
        }
        fn apply_tag(&self, _tag_id: &str, _note_id: &str) -> Result<(), HostError> {
            Ok(())
        }
        fn create_note(
            &self,
            _title: &str,
            _body: &str,
            _folder_id: &str,
            _is_todo: bool,
        ) -> Result<Note, HostError> {
            Err(HostError::failed("read only"))
        }
    }

    fn utils() -> DateAndTimeUtils {
        DateAndTimeUtils::new(
            "en_GB",
            "DD/MM/YYYY",
            "HH:mm",
            Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap()),
        )
    }

    fn dialog(response: Value) -> FakeDialog {
        FakeDialog {
            response: serde_json::from_value(response).unwrap(),
            shown: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_dialog_result() {
        let parse = |v: Value| {
            DialogResult::try_from(&serde_json::from_value::<RawDialogResponse>(v).unwrap())
        };
        assert_eq!(parse(json!({"id": "cancel"})).unwrap(), DialogResult::Cancel);
        assert_eq!(
            parse(json!({"id": "ok", "version": 1,
                "formData": {"variables": {"a": "x", "b": 2, "c": true}}}))
            .unwrap(),
            DialogResult::Confirm(BTreeMap::from([
                ("a".to_string(), "x".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "true".to_string()),
            ]))
        );
        for bad in [
            json!({"id": "ok"}),
            json!({"id": "ok", "formData": {}}),
            json!({"id": "ok", "formData": {"variables": ["a"]}}),
            json!({"id": "ok", "formData": {"variables": {"a": null}}}),
            json!({"id": "ok", "version": 2, "formData": {"variables": {}}}),
            json!({"id": "help"}),
        ] {
            assert!(
                matches!(parse(bad.clone()), Err(NoteError::MalformedDialogResponse { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_no_custom_variables() {
        let d = dialog(json!({"id": "cancel"}));
        let u = utils();
        let r = PromptResolver::new(&d, &FakeStore, &u)
            .resolve("t", &Map::new())
            .unwrap();
        assert_eq!(r, Resolution::Resolved(Map::new()));
        // No dialog was shown.
        assert!(d.shown.borrow().is_empty());
    }

    #[test]
    fn test_resolve() {
        let d = dialog(json!({"id": "ok", "formData": {"variables": {
            "name": "Ann", "count": "12", "done": "false",
            "when": "2021-08-31", "note": "id2", "bad": "x"
        }}}));
        let u = utils();
        let custom = json!({
            "name": "text", "count": "number", "done": "boolean",
            "when": "date", "note": {"type": "search", "query": "x"},
            "bad": "colour", "missing": "text"
        });
        let r = PromptResolver::new(&d, &FakeStore, &u)
            .resolve("t", custom.as_object().unwrap())
            .unwrap();
        assert_eq!(
            r,
            Resolution::Resolved(
                json!({
                    "name": "Ann", "count": 12, "done": false,
                    "when": "31/08/2021", "note": "id2", "missing": ""
                })
                .as_object()
                .unwrap()
                .to_owned()
            )
        );
        let html = &d.shown.borrow()[0];
        assert!(html.starts_with("<h2>Template variables</h2><form"));
        assert!(html.contains("bad has an invalid type."));
        // Both search result pages made it into the form.
        assert!(html.contains(r#"{"Note 1":"id1","Note 2":"id2"}"#));
    }

    #[test]
    fn test_cancel_and_malformed() {
        let u = utils();
        let custom = json!({"name": "text"});

        let d = dialog(json!({"id": "cancel"}));
        let r = PromptResolver::new(&d, &FakeStore, &u)
            .resolve("t", custom.as_object().unwrap())
            .unwrap();
        assert_eq!(r, Resolution::Cancelled);

        let d = dialog(json!({"id": "ok", "formData": null}));
        let err = PromptResolver::new(&d, &FakeStore, &u)
            .resolve("t", custom.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, NoteError::MalformedDialogResponse { .. }));

        // Unparsable date.
        let d = dialog(json!({"id": "ok", "formData": {"variables": {"when": "soon"}}}));
        let custom = json!({"when": "date"});
        let err = PromptResolver::new(&d, &FakeStore, &u)
            .resolve("t", custom.as_object().unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Was not able to parse soon according to format DD/MM/YYYY"
        );
    }

    #[test]
    fn test_malformed_response_is_logged() {
        // Only this test installs a logger.
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Trace);

        let u = utils();
        let custom = json!({"project": "text", "due": {"type": "date", "label": "Due"}});
        let d = dialog(json!({"id": "ok", "formData": {"other": 1}}));
        let title = "Malformed response template";
        let err = PromptResolver::new(&d, &FakeStore, &u)
            .resolve(title, custom.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, NoteError::MalformedDialogResponse { .. }));

        let records = captured(title);
        assert_eq!(records.len(), 1);
        let (level, msg) = &records[0];
        assert_eq!(*level, log::Level::Error);
        assert!(msg.contains(&err.to_string()), "{msg}");
        assert!(msg.contains(&format!("Template: {title}")), "{msg}");
        assert!(
            msg.contains(r#"Variables: {"project":"text","due":{"type":"date","label":"Due"}}"#),
            "{msg}"
        );
        assert!(msg.contains(r#""formData":{"other":1}"#), "{msg}");
        assert!(msg.contains(r#""id":"ok""#), "{msg}");
    }
}
