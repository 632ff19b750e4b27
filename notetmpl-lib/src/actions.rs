//! What happens with a parsed template: a new note, a new to-do, or text
//! inserted into the open note.
use crate::error::HostError;
use crate::host::{NewNote, NoteStore, Workspace};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateAction {
    NewNote,
    NewTodo,
    InsertText,
}

impl fmt::Display for TemplateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TemplateAction::NewNote => "newNote",
            TemplateAction::NewTodo => "newTodo",
            TemplateAction::InsertText => "insertText",
        })
    }
}

impl FromStr for TemplateAction {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newNote" => Ok(TemplateAction::NewNote),
            "newTodo" => Ok(TemplateAction::NewTodo),
            "insertText" => Ok(TemplateAction::InsertText),
            _ => Err(HostError::failed(format!("unknown template action `{s}`"))),
        }
    }
}

/// The ID of the tag `title`, created when missing.
fn tag_id(store: &dyn NoteStore, title: &str) -> Result<String, HostError> {
    match store.find_tag(title)? {
        Some(tag) => Ok(tag.id),
        None => {
            log::debug!("Creating tag `{}`", title);
            Ok(store.create_tag(title)?.id)
        }
    }
}

fn apply_tags(store: &dyn NoteStore, tags: &[String], note_id: &str) -> Result<(), HostError> {
    for tag in tags {
        store.apply_tag(&tag_id(store, tag)?, note_id)?;
    }
    Ok(())
}

/// Carries out `action` with the parsed template `note`. New notes land in
/// `note.folder` or, without one, in the selected notebook.
/// `apply_tags_while_inserting` decides whether inserting text also tags
/// the open note.
pub fn perform_action(
    action: TemplateAction,
    note: &NewNote,
    store: &dyn NoteStore,
    workspace: &dyn Workspace,
    apply_tags_while_inserting: bool,
) -> Result<(), HostError> {
    log::debug!("Performing `{}` with \"{}\"", action, note.title);
    match action {
        TemplateAction::InsertText => {
            workspace.insert_text(&note.body)?;
            if apply_tags_while_inserting {
                if let Some(current) = workspace.selected_note()? {
                    apply_tags(store, &note.tags, &current.id)?;
                }
            }
        }
        TemplateAction::NewNote | TemplateAction::NewTodo => {
            let folder_id = match &note.folder {
                Some(id) => id.to_owned(),
                None => workspace.selected_folder()?,
            };
            let created = store.create_note(
                &note.title,
                &note.body,
                &folder_id,
                action == TemplateAction::NewTodo,
            )?;
            workspace.open_note(&created.id)?;
            apply_tags(store, &note.tags, &created.id)?;
        }
    }
    Ok(())
}
