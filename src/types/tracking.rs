//! Tracking policy and refresh behaviour.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Independent change-tracking flags.
///
/// `NO_TRACKING` asks the backend not to cache query results (and makes
/// `remove` re-attach first); `REFRESH_AFTER_SAVE` reloads committed entities
/// from the store. Nothing forbids combining them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackingPolicy(u8);

impl TrackingPolicy {
    pub const NONE: Self = Self(0);
    pub const REFRESH_AFTER_SAVE: Self = Self(1);
    /// Explicit "commit only" marker
    pub const WITHOUT_REFRESH: Self = Self(2);
    pub const NO_TRACKING: Self = Self(4);

    const NAMES: [(Self, &'static str); 3] = [
        (Self::REFRESH_AFTER_SAVE, "refresh_after_save"),
        (Self::WITHOUT_REFRESH, "without_refresh"),
        (Self::NO_TRACKING, "no_tracking"),
    ];

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_no_tracking(self) -> bool {
        self.contains(Self::NO_TRACKING)
    }

    pub fn refreshes_after_save(self) -> bool {
        self.contains(Self::REFRESH_AFTER_SAVE)
    }
}

impl BitOr for TrackingPolicy {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for TrackingPolicy {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for TrackingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackingPolicy({self})")
    }
}

impl fmt::Display for TrackingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

impl FromStr for TrackingPolicy {
    type Err = String;

    /// Parse a comma separated flag list, e.g. `refresh_after_save,no_tracking`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut policy = Self::NONE;
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let token = token.to_ascii_lowercase();
            if token == "none" {
                continue;
            }
            let (flag, _) = Self::NAMES
                .iter()
                .find(|(_, name)| *name == token)
                .ok_or_else(|| format!("unknown tracking flag '{token}'"))?;
            policy |= *flag;
        }
        Ok(policy)
    }
}

/// Conflict policy applied when reloading from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Store values overwrite the entity
    #[default]
    StoreWins,
    /// The entity keeps its values; only store-computed columns are taken
    ClientWins,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "store" | "store_wins" => Ok(RefreshMode::StoreWins),
            "client" | "client_wins" => Ok(RefreshMode::ClientWins),
            other => Err(format!("unknown refresh mode '{other}'")),
        }
    }
}

/// What `refresh` does when the backend reports the entity is not tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Log the failure and return normally
    #[default]
    Lenient,
    /// Raise the failure
    Strict,
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(RefreshPolicy::Lenient),
            "strict" => Ok(RefreshPolicy::Strict),
            other => Err(format!("unknown refresh policy '{other}'")),
        }
    }
}
