use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest assignable patient id.
pub const MIN_UID: u16 = 1;
/// Largest assignable patient id.
pub const MAX_UID: u16 = 999;
/// Number of distinct ids the store can hand out.
pub const UID_CAPACITY: usize = (MAX_UID - MIN_UID + 1) as usize;

/// Short numeric patient identifier, rendered as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(u16);

impl Uid {
    pub fn new(value: u16) -> Option<Uid> {
        (MIN_UID..=MAX_UID).contains(&value).then_some(Uid(value))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Every id in the assignable range, ascending.
    pub fn all() -> impl Iterator<Item = Uid> {
        (MIN_UID..=MAX_UID).map(Uid)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: u16 = trimmed
            .parse()
            .map_err(|_| format!("invalid uid {trimmed:?}"))?;
        Uid::new(value).ok_or_else(|| format!("uid {value} outside {MIN_UID}..={MAX_UID}"))
    }
}

impl TryFrom<String> for Uid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.to_string()
    }
}
