//! Styles for the editor chrome.
//!
//! Only the eight named ANSI colors are used, so the editor follows the
//! terminal's palette. Emphasis comes from reverse video and bold.

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

pub fn plain() -> ContentStyle {
    ContentStyle::default()
}

pub fn dim() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Dim.into(),
        ..Default::default()
    }
}

pub fn menu_bar() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Reverse.into(),
        ..Default::default()
    }
}

pub fn menu_key() -> ContentStyle {
    ContentStyle {
        attributes: Attributes::from(Attribute::Reverse) | Attribute::Bold,
        ..Default::default()
    }
}

pub fn error() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn success() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Green),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn border() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Cyan),
        ..Default::default()
    }
}

pub fn popup_title() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn dialog_title() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Cyan),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn selected() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Reverse.into(),
        ..Default::default()
    }
}

pub fn directory() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Blue),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}
