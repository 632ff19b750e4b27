//! Collaborators provided by the host application: note storage, dialogs
//! and the editor workspace. All calls block until the host has answered.
use crate::error::HostError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored note. Templates are notes too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub title: String,
}

/// One page of a paginated host response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

/// The outcome of the template pipeline: what the new note will look like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub tags: Vec<String>,
    /// Target notebook. `None` means the notebook currently selected.
    pub folder: Option<String>,
    pub body: String,
}

/// What the variables dialog hands back, as the host sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDialogResponse {
    /// Schema version. Absent means 1.
    #[serde(default)]
    pub version: Option<u32>,
    /// Button pressed: `ok` or `cancel`.
    pub id: String,
    /// Expected: `{"variables": {"<name>": "<answer>", ...}}`.
    #[serde(default)]
    pub form_data: Option<Value>,
}

/// Access to notes, notebooks and tags. Page numbers start at 1.
pub trait NoteStore {
    fn get_note(&self, id: &str) -> Result<Note, HostError>;

    /// Full text search over notes.
    fn search_notes(&self, query: &str, page: u32) -> Result<Page<Note>, HostError>;

    fn folder_exists(&self, folder_id: &str) -> Result<bool, HostError>;

    fn notes_in_folder(&self, folder_id: &str, page: u32) -> Result<Page<Note>, HostError>;

    fn notes_with_tag(&self, tag_id: &str, page: u32) -> Result<Page<Note>, HostError>;

    /// The tag named `title`, if any.
    fn find_tag(&self, title: &str) -> Result<Option<Tag>, HostError>;

    fn create_tag(&self, title: &str) -> Result<Tag, HostError>;

    fn apply_tag(&self, tag_id: &str, note_id: &str) -> Result<(), HostError>;

    /// Stores a new note or to-do in `folder_id` and returns it.
    fn create_note(
        &self,
        title: &str,
        body: &str,
        folder_id: &str,
        is_todo: bool,
    ) -> Result<Note, HostError>;
}

/// Modal dialogs.
pub trait DialogHost {
    /// Shows the variables form `html` with "ok" and "cancel" buttons and
    /// waits for the user.
    fn open_variables_dialog(&self, title: &str, html: &str)
        -> Result<RawDialogResponse, HostError>;

    /// Shows `msg` to the user. Never fails.
    fn show_message(&self, msg: &str);
}

/// The editor around the plugin.
pub trait Workspace {
    fn selected_folder(&self) -> Result<String, HostError>;

    fn selected_note(&self) -> Result<Option<Note>, HostError>;

    /// Inserts `text` at the cursor of the open note.
    fn insert_text(&self, text: &str) -> Result<(), HostError>;

    fn open_note(&self, note_id: &str) -> Result<(), HostError>;
}

/// Collects all items of a paginated endpoint, requesting page after page
/// until `has_more` is false.
///
/// ```rust
/// use notetmpl_lib::host::{fetch_all, Page};
///
/// let all = fetch_all(|page| {
///     Ok(Page { items: vec![page], has_more: page < 3 })
/// })
/// .unwrap();
/// assert_eq!(all, [1, 2, 3]);
/// ```
pub fn fetch_all<T, F>(mut fetch_page: F) -> Result<Vec<T>, HostError>
where
    F: FnMut(u32) -> Result<Page<T>, HostError>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let response = fetch_page(page)?;
        items.extend(response.items);
        if !response.has_more {
            break;
        }
        page += 1;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetch_all() {
        let mut requested = Vec::new();
        let all = fetch_all(|page| {
            requested.push(page);
            Ok(Page {
                items: vec![page * 10, page * 10 + 1],
                has_more: page < 2,
            })
        })
        .unwrap();
        assert_eq!(all, [10, 11, 20, 21]);
        assert_eq!(requested, [1, 2]);

        let err = fetch_all::<u32, _>(|_| Err(HostError::failed("offline"))).unwrap_err();
        assert_eq!(err, HostError::failed("offline"));
    }

    #[test]
    fn test_deserialize_dialog_response() {
        let r: RawDialogResponse = serde_json::from_value(json!({
            "id": "ok",
            "formData": {"variables": {"a": "1"}}
        }))
        .unwrap();
        assert_eq!(r.version, None);
        assert_eq!(r.id, "ok");
        assert_eq!(r.form_data, Some(json!({"variables": {"a": "1"}})));

        let r: RawDialogResponse = serde_json::from_value(json!({"id": "cancel"})).unwrap();
        assert_eq!(r.form_data, None);
    }
}
