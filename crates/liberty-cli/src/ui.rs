//! Terminal styling shared by the subcommands.

use crossterm::style::{Color, StyledContent, Stylize};

/// Colors and icons used for command output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub feature: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub icons: Icons,
}

#[derive(Debug, Clone)]
pub struct Icons {
    pub installed: &'static str,
    pub present: &'static str,
    pub skipped: &'static str,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            feature: Color::Cyan,
            secondary: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            icons: Icons {
                installed: "+",
                present: "=",
                skipped: "-",
            },
        }
    }
}

impl Theme {
    pub fn feature<'a>(&self, name: &'a str) -> StyledContent<&'a str> {
        name.with(self.feature)
    }

    pub fn secondary<'a>(&self, text: &'a str) -> StyledContent<&'a str> {
        text.with(self.secondary)
    }

    /// `  <icon> <name>` with the icon in `color`.
    pub fn line(&self, icon: &str, color: Color, name: &str) -> String {
        format!("  {} {}", icon.with(color).bold(), self.feature(name))
    }

    pub fn header(&self, text: &str) -> String {
        format!("{}", text.bold())
    }
}
