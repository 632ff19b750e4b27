//! The `notetmpl-lib` library turns template notes into new notes. A
//! template is a note whose body starts with an optional YAML front matter
//! declaring variables, followed by a Handlebars template:
//!
//! ```md
//! ---
//! project: text
//! due:
//!   type: date
//!   label: Due date
//! template_title: {{ project }} - {{ date }}
//! template_tags: meeting, {{ project }}
//! ---
//! # {{ project }}, due {{ due }}
//! ```
//!
//! Custom variables (`project`, `due`) are asked for in a dialog, special
//! variables (`template_title`, `template_tags`, `template_notebook`,
//! `template_auto_incremented_prefix`) decide on the new note's metadata.
//! The body is rendered with the answers, the built-in date variables and
//! the helpers in `helpers`.
//!
//! The host application provides storage, dialogs and the workspace through
//! the traits in `host`. The high level API is `parser::Parser`; the
//! defaults of all configurable values are in `config`.
pub mod actions;
pub mod attributes;
pub mod classifier;
pub mod config;
pub mod content;
pub mod context;
pub mod datetime;
pub mod error;
pub mod front_matter;
pub mod helpers;
pub mod host;
pub mod js_value;
pub mod logger;
pub mod parser;
pub mod prompt;
pub mod special;
pub mod templates;
pub mod variable;
