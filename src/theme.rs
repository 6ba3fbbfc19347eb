use ratatui::style::{Color, Style};

/// Style set applied across every rendered widget. Swapping the whole set is
/// what the theme toggle does; nothing else in the app reads colors directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Theme {
    pub background: Style,
    pub text: Style,
    pub accent: Style,
    pub muted: Style,
    pub highlight: Style,
    pub error: Style,
}

impl Theme {
    pub(crate) fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    pub(crate) fn dark() -> Self {
        return Self {
            background: Style::new().bg(Color::Black),
            text: Style::new().fg(Color::Gray).bg(Color::Black),
            accent: Style::new().fg(Color::LightYellow).bg(Color::Black),
            muted: Style::new().fg(Color::DarkGray).bg(Color::Black),
            highlight: Style::new().fg(Color::Black).bg(Color::LightYellow),
            error: Style::new().fg(Color::LightRed).bg(Color::Black),
        };
    }

    pub(crate) fn light() -> Self {
        return Self {
            background: Style::new().bg(Color::White),
            text: Style::new().fg(Color::Black).bg(Color::White),
            accent: Style::new().fg(Color::Blue).bg(Color::White),
            muted: Style::new().fg(Color::DarkGray).bg(Color::White),
            highlight: Style::new().fg(Color::White).bg(Color::Blue),
            error: Style::new().fg(Color::Red).bg(Color::White),
        };
    }
}
