//! Domain records shared by the handlers and the backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role stored on the profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Student.
    Murid,
    /// Teacher.
    Guru,
    /// Member of the public.
    Awam,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Murid => "murid",
            Self::Guru => "guru",
            Self::Awam => "awam",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "murid" => Ok(Self::Murid),
            "guru" => Ok(Self::Guru),
            "awam" => Ok(Self::Awam),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Stored user record. `xp` is the denormalized total of the user's ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub xp: i64,
    pub name: Option<String>,
    pub sekolah: Option<String>,
    pub tingkatan: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One immutable row of the `xp_log` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct XpLedgerEntry {
    pub id: i64,
    pub user_id: Uuid,
    pub activity: String,
    pub amount: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Reading,
    Video,
    #[default]
    Other,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

/// Leaderboard aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Weekly,
    Monthly,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::All => "all",
        }
    }
}

impl FromStr for Period {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all" => Ok(Self::All),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// Ranked row produced by the backend leaderboard aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub xp: i64,
}

/// Completion row to insert, keyed by `(user_id, activity_key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCompletion {
    pub user_id: Uuid,
    pub activity_key: String,
    pub activity_type: ActivityType,
    pub xp: i32,
    pub metadata: Option<serde_json::Value>,
}

/// Result of recording a completion and awarding its XP together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Awarded { new_xp: i64 },
    /// The `(user_id, activity_key)` pair already existed; nothing was written.
    Duplicate,
    /// No profile row for the user; nothing was written.
    MissingProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub user_id: Uuid,
    pub event_type: String,
    pub metadata: Option<serde_json::Value>,
}
