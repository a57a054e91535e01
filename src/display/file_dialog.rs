//! Modal file chooser for `.ndp` files.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub const TITLE: &str = "Choose proof file";
/// Only files with this extension are listed.
pub const EXTENSION: &str = "ndp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Parent,
    Dir,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    /// Name as listed, with a trailing `/` on directories.
    pub fn label(&self) -> String {
        match self.kind {
            EntryKind::Parent => "../".to_string(),
            EntryKind::Dir => format!("{}/", self.name),
            EntryKind::File => self.name.clone(),
        }
    }
}

/// Result of feeding a key to the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Pending,
    Cancelled,
    Selected(PathBuf),
}

#[derive(Debug)]
pub struct FileDialog {
    dir: PathBuf,
    entries: Vec<Entry>,
    selected: usize,
    /// File name typed by the user; takes precedence over the selection.
    name: String,
    error: Option<String>,
}

impl FileDialog {
    /// Open the dialog in the directory containing `current_file`.
    pub fn for_file(current_file: &Path) -> Self {
        let dir = current_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::open(dir)
    }

    pub fn open(dir: &Path) -> Self {
        let mut dialog = Self {
            dir: PathBuf::new(),
            entries: Vec::new(),
            selected: 0,
            name: String::new(),
            error: None,
        };
        dialog.change_dir(dir);
        dialog
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn handle_key(&mut self, key: &KeyEvent, page: usize) -> DialogOutcome {
        match key.code {
            KeyCode::Esc => return DialogOutcome::Cancelled,
            KeyCode::Enter => return self.confirm(),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.select_down(1),
            KeyCode::PageUp => self.selected = self.selected.saturating_sub(page.max(1)),
            KeyCode::PageDown => self.select_down(page.max(1)),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.entries.len().saturating_sub(1),
            KeyCode::Tab => {
                if let Some(entry) = self.entries.get(self.selected)
                    && entry.kind == EntryKind::File
                {
                    self.name = entry.name.clone();
                }
            }
            KeyCode::Backspace => {
                self.name.pop();
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.name.push(c);
            }
            _ => {}
        }
        DialogOutcome::Pending
    }

    fn select_down(&mut self, n: usize) {
        let last = self.entries.len().saturating_sub(1);
        self.selected = (self.selected + n).min(last);
    }

    fn confirm(&mut self) -> DialogOutcome {
        if !self.name.is_empty() {
            let path = self.dir.join(&self.name);
            if path.is_dir() {
                self.change_dir(&path);
                return DialogOutcome::Pending;
            }
            return DialogOutcome::Selected(path);
        }
        let Some(entry) = self.entries.get(self.selected).cloned() else {
            return DialogOutcome::Pending;
        };
        match entry.kind {
            EntryKind::Parent => {
                if let Some(parent) = self.dir.parent().map(Path::to_path_buf) {
                    self.change_dir(&parent);
                }
                DialogOutcome::Pending
            }
            EntryKind::Dir => {
                let target = self.dir.join(&entry.name);
                self.change_dir(&target);
                DialogOutcome::Pending
            }
            EntryKind::File => DialogOutcome::Selected(self.dir.join(&entry.name)),
        }
    }

    fn change_dir(&mut self, dir: &Path) {
        self.dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        self.name.clear();
        self.selected = 0;
        match list_dir(&self.dir) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(e) => {
                self.entries = Vec::new();
                self.error = Some(format!("Cannot read {}: {e}", self.dir.display()));
            }
        }
        if self.dir.parent().is_some() {
            self.entries.insert(
                0,
                Entry {
                    name: "..".to_string(),
                    kind: EntryKind::Parent,
                },
            );
        }
    }
}

/// Visible directories and `.ndp` files of `dir`, directories first.
fn list_dir(dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = item.path();
        if path.is_dir() {
            entries.push(Entry {
                name,
                kind: EntryKind::Dir,
            });
        } else if path.extension().is_some_and(|ext| ext == EXTENSION) {
            entries.push(Entry {
                name,
                kind: EntryKind::File,
            });
        }
    }
    entries.sort_by(|a, b| match a.kind.cmp(&b.kind) {
        Ordering::Equal => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        other => other,
    });
    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.ndp"), "").unwrap();
        fs::write(dir.path().join("A.ndp"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden.ndp"), "").unwrap();
        fs::create_dir(dir.path().join("lemmas")).unwrap();
        fs::write(dir.path().join("lemmas").join("l1.ndp"), "").unwrap();
        dir
    }

    fn labels(dialog: &FileDialog) -> Vec<String> {
        dialog.entries().iter().map(Entry::label).collect()
    }

    #[test]
    fn lists_directories_then_proof_files() {
        let dir = project();
        let dialog = FileDialog::open(dir.path());
        assert_eq!(labels(&dialog), vec!["../", "lemmas/", "A.ndp", "b.ndp"]);
    }

    #[test]
    fn enter_on_directory_navigates_and_parent_returns() {
        let dir = project();
        let mut dialog = FileDialog::open(dir.path());
        dialog.handle_key(&key(KeyCode::Down), 10);
        assert_eq!(dialog.handle_key(&key(KeyCode::Enter), 10), DialogOutcome::Pending);
        assert_eq!(labels(&dialog), vec!["../", "l1.ndp"]);

        dialog.handle_key(&key(KeyCode::Home), 10);
        dialog.handle_key(&key(KeyCode::Enter), 10);
        assert_eq!(dialog.dir(), fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn enter_on_file_selects_it() {
        let dir = project();
        let mut dialog = FileDialog::open(dir.path());
        dialog.handle_key(&key(KeyCode::End), 10);
        let outcome = dialog.handle_key(&key(KeyCode::Enter), 10);
        assert_eq!(
            outcome,
            DialogOutcome::Selected(fs::canonicalize(dir.path()).unwrap().join("b.ndp"))
        );
    }

    #[test]
    fn typed_name_creates_new_file_path() {
        let dir = project();
        let mut dialog = FileDialog::open(dir.path());
        for c in "new.ndp".chars() {
            dialog.handle_key(&key(KeyCode::Char(c)), 10);
        }
        dialog.handle_key(&key(KeyCode::Char('x')), 10);
        dialog.handle_key(&key(KeyCode::Backspace), 10);
        assert_eq!(dialog.name(), "new.ndp");
        let outcome = dialog.handle_key(&key(KeyCode::Enter), 10);
        assert_eq!(
            outcome,
            DialogOutcome::Selected(fs::canonicalize(dir.path()).unwrap().join("new.ndp"))
        );
    }

    #[test]
    fn tab_copies_selected_file_name() {
        let dir = project();
        let mut dialog = FileDialog::open(dir.path());
        dialog.handle_key(&key(KeyCode::PageDown), 2);
        dialog.handle_key(&key(KeyCode::Tab), 10);
        assert_eq!(dialog.name(), "A.ndp");
    }

    #[test]
    fn escape_cancels() {
        let dir = project();
        let mut dialog = FileDialog::open(dir.path());
        assert_eq!(
            dialog.handle_key(&key(KeyCode::Esc), 10),
            DialogOutcome::Cancelled
        );
    }

    #[test]
    fn unreadable_directory_reports_error() {
        let dir = TempDir::new().unwrap();
        let dialog = FileDialog::open(&dir.path().join("gone"));
        assert!(dialog.error().unwrap().starts_with("Cannot read "));
        assert_eq!(labels(&dialog), vec!["../"]);
    }

    #[test]
    fn for_file_without_parent_uses_working_directory() {
        let dialog = FileDialog::for_file(Path::new("New Proof.ndp"));
        assert_eq!(dialog.dir(), fs::canonicalize(".").unwrap());
    }
}
