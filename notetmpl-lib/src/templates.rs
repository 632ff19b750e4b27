//! Finds template notes: the notes in the templates notebook and the notes
//! carrying the template tag.
use crate::config::{DefaultKind, LibCfg};
use crate::error::HostError;
use crate::host::{fetch_all, Note, NoteStore};
use itertools::Itertools;

/// All notes in the notebook `folder_id` (if any) and all notes tagged with
/// `cfg.templates.tag`. A source that fails is logged and skipped. Every
/// template appears once, sorted by title ignoring case.
pub fn list_templates(store: &dyn NoteStore, cfg: &LibCfg) -> Vec<Note> {
    let mut templates = Vec::new();

    if let Some(folder_id) = cfg.templates.folder_id.as_deref() {
        match fetch_all(|page| store.notes_in_folder(folder_id, page)) {
            Ok(notes) => templates.extend(notes),
            Err(e) => log::error!("Can not fetch the notes in the templates notebook:\n{}", e),
        }
    }

    match notes_with_tag(store, &cfg.templates.tag) {
        Ok(notes) => templates.extend(notes),
        Err(e) => log::error!(
            "Can not fetch the notes with tag `{}`:\n{}",
            cfg.templates.tag,
            e
        ),
    }

    templates
        .into_iter()
        .unique_by(|n| n.id.clone())
        .sorted_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title))
        })
        .collect()
}

fn notes_with_tag(store: &dyn NoteStore, tag: &str) -> Result<Vec<Note>, HostError> {
    match store.find_tag(tag)? {
        Some(tag) => fetch_all(|page| store.notes_with_tag(&tag.id, page)),
        None => Ok(Vec::new()),
    }
}

/// Loads a template. `None` when there is no ID or loading fails.
pub fn get_template_from_id(store: &dyn NoteStore, template_id: Option<&str>) -> Option<Note> {
    let id = template_id.filter(|id| !id.is_empty())?;
    store
        .get_note(id)
        .map_err(|e| log::error!("Can not load template `{}`:\n{}", id, e))
        .ok()
}

/// Loads the default template of `kind` for the notebook `folder_id`.
pub fn get_default_template(
    store: &dyn NoteStore,
    cfg: &LibCfg,
    kind: DefaultKind,
    folder_id: Option<&str>,
) -> Option<Note> {
    get_template_from_id(store, cfg.default_template_id(kind, folder_id))
}
