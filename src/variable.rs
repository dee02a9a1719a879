use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Pressure level attached to geopotential height requests (hPa).
pub const GH_LEVEL_HPA: u32 = 500;

/// Variables that can be retrieved from the TIGGE archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// 2 metre temperature.
    T2m,
    /// Total precipitation.
    Tp,
    /// Geopotential height at 500 hPa.
    Gh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelType {
    Surface,
    PressureLevel,
}

impl LevelType {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelType::Surface => "sfc",
            LevelType::PressureLevel => "pl",
        }
    }
}

impl Variable {
    pub const ALL: [Variable; 3] = [Variable::T2m, Variable::Tp, Variable::Gh];

    pub fn name(self) -> &'static str {
        match self {
            Variable::T2m => "t2m",
            Variable::Tp => "tp",
            Variable::Gh => "gh",
        }
    }

    /// GRIB parameter code used in the `param` keyword.
    pub fn param_code(self) -> &'static str {
        match self {
            Variable::T2m => "167",
            Variable::Tp => "228228",
            Variable::Gh => "156",
        }
    }

    pub fn level_type(self) -> LevelType {
        match self {
            Variable::Gh => LevelType::PressureLevel,
            _ => LevelType::Surface,
        }
    }

    /// Only pressure-level variables carry a level.
    pub fn level(self) -> Option<u32> {
        match self.level_type() {
            LevelType::PressureLevel => Some(GH_LEVEL_HPA),
            LevelType::Surface => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl FromStr for Variable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::from_name(s.trim()).ok_or_else(|| Error::UnknownVariable(s.to_string()))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
