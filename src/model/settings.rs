//! User settings persisted in the `settings` table.

use serde::{Deserialize, Serialize};

/// Color scheme preference. `System` follows the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Known setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SettingKey {
    Theme,
    CurrentProject,
    CurrentOrg,
}

impl SettingKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::CurrentProject => "current_project",
            Self::CurrentOrg => "current_org",
        }
    }

    pub const ALL: [Self; 3] = [Self::Theme, Self::CurrentProject, Self::CurrentOrg];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
        assert_eq!(Theme::default(), Theme::System);
    }
}
