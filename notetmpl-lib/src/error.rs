//! Custom error types.

use thiserror::Error;

/// The error `InvalidFrontMatterYaml` prints the front matter section of the
/// template. This constant limits the number of text lines that are printed.
pub const FRONT_MATTER_ERROR_MAX_LINES: usize = 20;

/// Error related to configuration deserialization.
#[derive(Debug, Error)]
pub enum LibCfgError {
    /// Remedy: enter a non empty value.
    #[error(
        "Configuration error:\n\
         the variable `{var}` must not be empty."
    )]
    EmptyValue { var: String },

    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),
}

/// Error related to moment style date and time formats.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    /// Remedy: enter the value in the configured format.
    #[error("Was not able to parse {input} according to format {format}")]
    Parse { input: String, format: String },

    /// Remedy: check the date arithmetic in the template.
    #[error("Date and time out of range.")]
    OutOfRange,
}

/// Error related to helper hash attributes, e.g. `delta_days=...`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// Remedy: pass a number.
    #[error("Can't convert \"{value}\" to number while parsing {name}.")]
    NotANumber { value: String, name: String },
}

/// Error reported by the host application.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host could not carry out the request.
    #[error("Host error:\n{msg}")]
    Failed { msg: String },

    /// Remedy: check the ID.
    #[error("Not found: {id}")]
    NotFound { id: String },
}

impl HostError {
    /// Convenience constructor.
    pub fn failed(msg: impl Into<String>) -> Self {
        HostError::Failed { msg: msg.into() }
    }
}

/// Error type returned by the template pipeline.
#[derive(Debug, Error)]
pub enum NoteError {
    /// Remedy: use only letters, digits and `_` in variable names.
    #[error(
        "Variable name \"{name}\" is invalid.\n\n\
         Please only use alphanumeric characters and underscores\n\
         in variable names."
    )]
    InvalidVariableName { name: String },

    /// Remedy: quote the value in the front matter.
    #[error(
        "The value of the front matter field `{field_name}:`\n\
         must be a string."
    )]
    SpecialVariableNotString { field_name: String },

    /// Remedy: check the notebook ID in `template_notebook`.
    #[error("There is no notebook with ID: {id}")]
    NotebookNotFound { id: String },

    /// Remedy: renumber or rename the note with the highest number.
    #[error(
        "Can not number the new note: a note titled \"{prefix}-{max}: ...\" \
         already has the highest possible number."
    )]
    AutoIncrementOverflow { prefix: String, max: u64 },

    /// Remedy: check YAML syntax in the template's front matter.
    #[error(
        "Can not parse front matter:\n\
         \n\
         {front_matter}\
         \n\
         {source_error}"
    )]
    InvalidFrontMatterYaml {
        front_matter: String,
        source_error: serde_yaml::Error,
    },

    /// Remedy: the front matter must be a mapping of `key: value` lines.
    #[error(
        "The front matter must consist of `key: value`\n\
         lines:\n\
         \n\
         {front_matter}"
    )]
    FrontMatterNotMapping { front_matter: String },

    /// Remedy: update the host application. Details are in the log file.
    #[error(
        "The variables dialog returned an unexpected\n\
         response:\n\
         {reason}"
    )]
    MalformedDialogResponse { reason: String },

    /// Remedy: check the template syntax and the helper arguments.
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),

    #[error(transparent)]
    DateTime(#[from] DateTimeError),

    #[error(transparent)]
    Host(#[from] HostError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_construct() {
        let e = NoteError::InvalidVariableName {
            name: "invalid@var".to_string(),
        };
        assert!(e
            .to_string()
            .contains("Variable name \"invalid@var\" is invalid."));

        let e = NoteError::NotebookNotFound {
            id: "doesnotexist".to_string(),
        };
        assert_eq!(e.to_string(), "There is no notebook with ID: doesnotexist");

        let e: NoteError = DateTimeError::Parse {
            input: "23:62".to_string(),
            format: "HH:mm".to_string(),
        }
        .into();
        assert_eq!(
            e.to_string(),
            "Was not able to parse 23:62 according to format HH:mm"
        );
    }
}
