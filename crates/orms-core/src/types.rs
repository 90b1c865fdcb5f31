use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OrmsError;

/// The fan-out sentinel accepted wherever a single ORM is expected.
pub const ALL_TARGET: &str = "all";

// ---------------------------------------------------------------------------
// Orm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orm {
    Prisma,
    Typeorm,
    Sequelize,
    Drizzle,
}

impl Orm {
    /// Every ORM in declaration order. Fan-out actions iterate this order.
    pub const ALL: [Orm; 4] = [Orm::Prisma, Orm::Typeorm, Orm::Sequelize, Orm::Drizzle];

    pub fn as_str(self) -> &'static str {
        match self {
            Orm::Prisma => "prisma",
            Orm::Typeorm => "typeorm",
            Orm::Sequelize => "sequelize",
            Orm::Drizzle => "drizzle",
        }
    }

    /// `prisma, typeorm, sequelize, drizzle, all`
    pub fn joined_with_all() -> String {
        let mut names: Vec<&str> = Orm::ALL.iter().map(|o| o.as_str()).collect();
        names.push(ALL_TARGET);
        names.join(", ")
    }
}

impl fmt::Display for Orm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orm {
    type Err = OrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Orm::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| OrmsError::InvalidTarget(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Single(Orm),
    All,
}

impl Target {
    /// The ORMs this target covers, in declaration order.
    pub fn orms(self) -> Vec<Orm> {
        match self {
            Target::Single(orm) => vec![orm],
            Target::All => Orm::ALL.to_vec(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Single(orm) => f.write_str(orm.as_str()),
            Target::All => f.write_str(ALL_TARGET),
        }
    }
}

impl std::str::FromStr for Target {
    type Err = OrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_TARGET {
            return Ok(Target::All);
        }
        s.parse().map(Target::Single)
    }
}

// ---------------------------------------------------------------------------
// Verb
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    #[serde(rename = "db:up")]
    DbUp,
    #[serde(rename = "db:down")]
    DbDown,
    #[serde(rename = "db:reset")]
    DbReset,
    #[serde(rename = "service:dev")]
    ServiceDev,
    #[serde(rename = "service:start")]
    ServiceStart,
    #[serde(rename = "dev")]
    Dev,
}

impl Verb {
    pub fn all() -> &'static [Verb] {
        &[
            Verb::DbUp,
            Verb::DbDown,
            Verb::DbReset,
            Verb::ServiceDev,
            Verb::ServiceStart,
            Verb::Dev,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::DbUp => "db:up",
            Verb::DbDown => "db:down",
            Verb::DbReset => "db:reset",
            Verb::ServiceDev => "service:dev",
            Verb::ServiceStart => "service:start",
            Verb::Dev => "dev",
        }
    }

    /// Whether the verb accepts the `all` target.
    pub fn supports_fan_out(self) -> bool {
        !matches!(self, Verb::ServiceDev | Verb::ServiceStart)
    }

    pub fn joined() -> String {
        Verb::all()
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn fan_out_joined() -> String {
        Verb::all()
            .iter()
            .filter(|v| v.supports_fan_out())
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verb {
    type Err = OrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| OrmsError::UnknownCommand(s.to_string()))
    }
}
