//! Positional placeholder styles
//!
//! Every statement is built with a single sequence so placeholders are numbered
//! in the same order their arguments are pushed.

use serde::{Deserialize, Serialize};

/// Placeholder dialect used when rendering statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderFormat {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
    /// `:1, :2, ...` (Oracle)
    Colon,
    /// `@p1, @p2, ...` (SQL Server)
    AtP,
}

impl PlaceholderFormat {
    /// Render the placeholder for the 1-based argument position
    pub fn render(&self, position: usize) -> String {
        match self {
            PlaceholderFormat::Question => "?".to_string(),
            PlaceholderFormat::Dollar => format!("${}", position),
            PlaceholderFormat::Colon => format!(":{}", position),
            PlaceholderFormat::AtP => format!("@p{}", position),
        }
    }

    /// Start a new placeholder sequence at position 1
    pub fn sequence(&self) -> Placeholders {
        Placeholders {
            format: *self,
            next: 1,
        }
    }
}

/// Running placeholder counter for one statement
#[derive(Debug)]
pub struct Placeholders {
    format: PlaceholderFormat,
    next: usize,
}

impl Placeholders {
    /// Render the next placeholder and advance the counter
    pub fn next(&mut self) -> String {
        let rendered = self.format.render(self.next);
        self.next += 1;
        rendered
    }

    /// Number of placeholders handed out so far
    pub fn count(&self) -> usize {
        self.next - 1
    }
}
