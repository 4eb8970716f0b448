//! Id-or-name references
//!
//! Several commands take one argument that is either a numeric id or a
//! name/login. The numeric form wins whenever the input parses as one.

use std::fmt;

/// A reference to a record by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(u64),
    Name(String),
}

impl Lookup {
    /// Parses user input, trying a numeric id first
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => Lookup::Id(id),
            Err(_) => Lookup::Name(trimmed.to_string()),
        }
    }

    /// Returns the id if this is a numeric reference
    pub fn as_id(&self) -> Option<u64> {
        match self {
            Lookup::Id(id) => Some(*id),
            Lookup::Name(_) => None,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "{}", id),
            Lookup::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for Lookup {
    fn from(s: &str) -> Self {
        Lookup::parse(s)
    }
}
