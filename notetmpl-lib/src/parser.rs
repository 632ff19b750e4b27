//! Turns a template note into a new note: the high level API of this
//! library.
//!
//! ```rust
//! use notetmpl_lib::config::LibCfg;
//! use notetmpl_lib::datetime::{DateAndTimeUtils, FixedClock};
//! use notetmpl_lib::error::HostError;
//! use notetmpl_lib::host::{DialogHost, Note, NoteStore, Page, RawDialogResponse, Tag};
//! use notetmpl_lib::parser::Parser;
//! use std::sync::Arc;
//!
//! struct NoDialog;
//! impl DialogHost for NoDialog {
//!     fn open_variables_dialog(&self, _: &str, _: &str) -> Result<RawDialogResponse, HostError> {
//!         Err(HostError::failed("no dialog"))
//!     }
//!     fn show_message(&self, msg: &str) {
//!         eprintln!("{msg}");
//!     }
//! }
//!
//! struct NoStore;
//! impl NoteStore for NoStore {
//!     fn get_note(&self, id: &str) -> Result<Note, HostError> {
//!         Err(HostError::NotFound { id: id.to_string() })
//!     }
//!     fn search_notes(&self, _: &str, _: u32) -> Result<Page<Note>, HostError> {
//!         Ok(Page { items: vec![], has_more: false })
//!     }
//!     fn folder_exists(&self, _: &str) -> Result<bool, HostError> {
//!         Ok(false)
//!     }
//!     fn notes_in_folder(&self, _: &str, _: u32) -> Result<Page<Note>, HostError> {
//!         Ok(Page { items: vec![], has_more: false })
//!     }
//!     fn notes_with_tag(&self, _: &str, _: u32) -> Result<Page<Note>, HostError> {
//!         Ok(Page { items: vec![], has_more: false })
//!     }
//!     fn find_tag(&self, _: &str) -> Result<Option<Tag>, HostError> {
//!         Ok(None)
//!     }
//!     fn create_tag(&self, _: &str) -> Result<Tag, HostError> {
//!         Err(HostError::failed("read only"))
//!     }
//!     fn apply_tag(&self, _: &str, _: &str) -> Result<(), HostError> {
//!         Err(HostError::failed("read only"))
//!     }
//!     fn create_note(&self, _: &str, _: &str, _: &str, _: bool) -> Result<Note, HostError> {
//!         Err(HostError::failed("read only"))
//!     }
//! }
//!
//! let clock = Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap());
//! let cfg = LibCfg::default();
//! let utils = DateAndTimeUtils::from_cfg(&cfg.date_time, clock);
//! let parser = Parser::new(utils, &NoStore, &NoDialog);
//!
//! let template = Note {
//!     id: "t1".to_string(),
//!     title: "Daily".to_string(),
//!     body: "---\ntemplate_title: Daily {{ date }}\ntemplate_tags: log, daily\n---\n\
//!            Log {{ datetime }}\n"
//!         .to_string(),
//! };
//! let note = parser.parse_template(Some(&template)).unwrap();
//! assert_eq!(note.title, "Daily 12/08/2021");
//! assert_eq!(note.tags, ["log", "daily"]);
//! assert_eq!(note.folder, None);
//! assert_eq!(note.body, "Log 12/08/2021 17:04\n");
//! ```
use crate::classifier::classify;
use crate::content::{Content, ContentString};
use crate::context::Context;
use crate::datetime::DateAndTimeUtils;
use crate::error::NoteError;
use crate::front_matter::{quote_special_variables, FrontMatter};
use crate::helpers::TemplateEngine;
use crate::host::{DialogHost, NewNote, Note, NoteStore};
use crate::prompt::{PromptResolver, Resolution};
use crate::special::SpecialVariableResolver;

/// Shown to the user before the error message.
const PARSE_ERROR_MSG: &str =
    "There was an error parsing this template, please review it and try again.";

/// Owns the template engine and talks to the host.
pub struct Parser<'a> {
    engine: TemplateEngine,
    store: &'a dyn NoteStore,
    dialog: &'a dyn DialogHost,
}

impl<'a> Parser<'a> {
    /// The helpers are registered here, once.
    pub fn new(
        utils: DateAndTimeUtils,
        store: &'a dyn NoteStore,
        dialog: &'a dyn DialogHost,
    ) -> Self {
        Self {
            engine: TemplateEngine::new(utils),
            store,
            dialog,
        }
    }

    /// Builds the new note out of `template`. Returns `None` when no note
    /// should be created: no template, the user cancelled or there was an
    /// error. Errors are shown to the user before returning.
    pub fn parse_template(&self, template: Option<&Note>) -> Option<NewNote> {
        let template = template?;
        match self.try_parse_template(template) {
            Ok(note) => note,
            Err(e) => {
                log::debug!("Template `{}` ({}) failed:\n{}", template.title, template.id, e);
                self.dialog.show_message(&format!("{PARSE_ERROR_MSG}\n\n{e}"));
                None
            }
        }
    }

    /// Like `parse_template()`, but errors are returned. `Ok(None)` means
    /// the user cancelled.
    pub fn try_parse_template(&self, template: &Note) -> Result<Option<NewNote>, NoteError> {
        let utils = self.engine.utils();
        let content = ContentString::from_string(quote_special_variables(&template.body));
        let front_matter = FrontMatter::try_from(content.header())?;
        let classified = classify(&front_matter, &template.title)?;

        let values = match PromptResolver::new(self.dialog, self.store, utils)
            .resolve(&template.title, &classified.custom)?
        {
            Resolution::Cancelled => return Ok(None),
            Resolution::Resolved(values) => values,
        };

        let mut context = Context::from_builtins(utils);
        context.insert_values(&values);

        let resolver = SpecialVariableResolver::new(&self.engine, self.store);
        let special = resolver.render(&classified.special, &*context)?;
        let metadata = resolver.resolve(&special)?;

        context.insert_special(&special);
        let body = self.engine.render(content.body(), &context.into_value())?;

        Ok(Some(NewNote {
            title: metadata.title,
            tags: metadata.tags,
            folder: metadata.folder,
            body,
        }))
    }
}
