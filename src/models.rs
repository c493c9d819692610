use std::fmt;

/// How a record is matched to an identifier and how it is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Raw substring search, every occurrence replaced
    #[default]
    #[value(alias = "raw")]
    Literal,
    /// Only `"event_id":"<uuid>"` fields are considered
    #[value(alias = "semantic")]
    Structured,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Literal => f.write_str("literal"),
            Mode::Structured => f.write_str("structured"),
        }
    }
}

/// A record chosen as the one to rewrite for an identifier.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub identifier: &'a str,
    pub record: &'a str,
}

/// A rewritten record and the identifier it now carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub new_id: String,
    pub record: String,
}
