use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        /// Accepts a JSON number or a numeric string such as `"17"`.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                match NumericId::deserialize(deserializer)? {
                    NumericId::Number(id) => Ok(Self(id)),
                    NumericId::Text(raw) => raw
                        .trim()
                        .parse()
                        .map(Self)
                        .map_err(|_| de::Error::custom(format!("invalid id '{raw}'"))),
                }
            }
        }
    };
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericId {
    Number(i64),
    Text(String),
}

id_newtype!(GuardId);
id_newtype!(ScanLogId);

/// Direction of travel through a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    #[default]
    Entry,
    Exit,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Gate::Entry => "entry",
            Gate::Exit => "exit",
        }
    }

    /// Capitalised label used in operator feedback ("Entry Logged").
    pub fn label(self) -> &'static str {
        match self {
            Gate::Entry => "Entry",
            Gate::Exit => "Exit",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gate '{0}', expected 'entry' or 'exit'")]
pub struct ParseGateError(pub String);

impl FromStr for Gate {
    type Err = ParseGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "in" => Ok(Gate::Entry),
            "exit" | "out" => Ok(Gate::Exit),
            _ => Err(ParseGateError(s.to_string())),
        }
    }
}

pub const STATUS_APPROVED: &str = "approved";

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
