use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Menu-level commands, reachable from the menu bar shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Open,
    Save,
    Compile,
    Check,
    Format,
    Quit,
}

/// Text editing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Insert(char),
    Paste(String),
    Newline,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    PageUp,
    PageDown,
    DocStart,
    DocEnd,
}

/// Result of mapping a key press in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    None,
    Menu(MenuCommand),
    Edit(EditCommand),
}

/// Menu bar entries: label and shortcut hint.
pub const MENU: &[(MenuCommand, &str, &str)] = &[
    (MenuCommand::Open, "Open", "^O"),
    (MenuCommand::Save, "Save", "^S/F2"),
    (MenuCommand::Compile, "Compile", "^⇧C/F3"),
    (MenuCommand::Check, "Check", "^⌥C/F4"),
    (MenuCommand::Format, "Format", "^⌥⇧F/F5"),
    (MenuCommand::Quit, "Quit", "^Q"),
];

/// Map a key event in the text area to an action.
///
/// Ctrl+Shift and Ctrl+Alt chords are only distinguishable on terminals with
/// keyboard enhancement; the function keys work everywhere.
pub fn map_key(event: &KeyEvent) -> InputAction {
    if event.kind == KeyEventKind::Release {
        return InputAction::None;
    }
    let mods = event.modifiers;
    let ctrl = mods.contains(KeyModifiers::CONTROL);
    let alt = mods.contains(KeyModifiers::ALT);
    let shift = mods.contains(KeyModifiers::SHIFT);

    if let Some(menu) = map_menu(event.code, ctrl, alt, shift) {
        return InputAction::Menu(menu);
    }

    let edit = match event.code {
        // Some terminals report Shift+letter as the unshifted key.
        KeyCode::Char(c) if !ctrl && !alt && shift => EditCommand::Insert(c.to_ascii_uppercase()),
        KeyCode::Char(c) if !ctrl && !alt => EditCommand::Insert(c),
        // AltGr arrives as Ctrl+Alt on Windows.
        KeyCode::Char(c) if ctrl && alt && !c.is_ascii_alphabetic() => EditCommand::Insert(c),
        KeyCode::Enter => EditCommand::Newline,
        KeyCode::Tab => EditCommand::Tab,
        KeyCode::Backspace => EditCommand::Backspace,
        KeyCode::Delete => EditCommand::Delete,
        KeyCode::Left => EditCommand::Left,
        KeyCode::Right => EditCommand::Right,
        KeyCode::Up => EditCommand::Up,
        KeyCode::Down => EditCommand::Down,
        KeyCode::Home if ctrl => EditCommand::DocStart,
        KeyCode::End if ctrl => EditCommand::DocEnd,
        KeyCode::Home => EditCommand::LineStart,
        KeyCode::End => EditCommand::LineEnd,
        KeyCode::PageUp => EditCommand::PageUp,
        KeyCode::PageDown => EditCommand::PageDown,
        _ => return InputAction::None,
    };
    InputAction::Edit(edit)
}

fn map_menu(code: KeyCode, ctrl: bool, alt: bool, shift: bool) -> Option<MenuCommand> {
    match code {
        KeyCode::F(2) => return Some(MenuCommand::Save),
        KeyCode::F(3) => return Some(MenuCommand::Compile),
        KeyCode::F(4) => return Some(MenuCommand::Check),
        KeyCode::F(5) => return Some(MenuCommand::Format),
        _ => {}
    }
    if !ctrl {
        return None;
    }
    let KeyCode::Char(c) = code else {
        return None;
    };
    match (c.to_ascii_lowercase(), alt, shift) {
        ('o', false, false) => Some(MenuCommand::Open),
        ('s', false, false) => Some(MenuCommand::Save),
        ('q', false, false) => Some(MenuCommand::Quit),
        ('c', false, true) => Some(MenuCommand::Compile),
        ('c', true, false) => Some(MenuCommand::Check),
        ('f', true, true) => Some(MenuCommand::Format),
        _ => None,
    }
}

/// Normalize pasted text to the buffer's `\n` line endings.
pub fn normalize_paste(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
