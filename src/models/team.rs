use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'teams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,

    /// One of DEV, DATA, DEVOPS.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub team_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamType {
    Dev,
    Data,
    Devops,
}

impl TeamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamType::Dev => "DEV",
            TeamType::Data => "DATA",
            TeamType::Devops => "DEVOPS",
        }
    }
}

/// Teams created on first start when the table is empty.
pub const DEFAULT_TEAMS: [(&str, TeamType); 5] = [
    ("Development Team 1", TeamType::Dev),
    ("Development Team 2", TeamType::Dev),
    ("Data Analyst Team 1", TeamType::Data),
    ("Data Analyst Team 2", TeamType::Data),
    ("DevOps Team", TeamType::Devops),
];
