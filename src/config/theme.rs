use std::fmt;
use std::str::FromStr;

/// Terminal color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The stored token.
    pub fn token(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Label for the toggle, naming the theme it switches to.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Light => "Switch to Dark",
            Self::Dark => "Switch to Light",
        }
    }

    /// Color an error message.
    pub fn paint_error(self, text: &str) -> String {
        let code = match self {
            Self::Light => "31",
            Self::Dark => "91",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    /// Color run output.
    pub fn paint_output(self, text: &str) -> String {
        match self {
            Self::Light => text.to_string(),
            Self::Dark => format!("\x1b[96m{text}\x1b[0m"),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}
