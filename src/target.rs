use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::period::yyyymmdd;
use crate::request::{ForecastType, InitTime};
use crate::variable::Variable;

pub const TARGET_PATTERN: &str =
    "{root}/{variable}/{type}/{year}/{month}/{HHMM}/{variable}_6hr_ECMWF_{type}_{region}-05_{yyyymmdd}.grib";

pub const DEFAULT_ROOT: &str = "/g/data/xv83/TIGGE/data/ECMWF";
pub const DEFAULT_REGION: &str = "GLO";

/// Where retrieved files land on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    pub root: PathBuf,
    pub region: String,
}

impl Default for TargetLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl TargetLayout {
    pub fn new(root: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            region: region.into(),
        }
    }

    pub fn target_path(
        &self,
        variable: Variable,
        typ: ForecastType,
        init_time: InitTime,
        date: NaiveDate,
    ) -> PathBuf {
        let raw = self.root.to_string_lossy();
        // "/" trims to "", which still formats as an absolute path.
        let root = if raw.is_empty() { "." } else { raw.trim_end_matches('/') };
        let path = format_target(
            TARGET_PATTERN,
            root,
            &self.region,
            variable,
            typ,
            init_time,
            date,
        );
        PathBuf::from(path)
    }
}

pub fn format_target(
    pattern: &str,
    root: &str,
    region: &str,
    variable: Variable,
    typ: ForecastType,
    init_time: InitTime,
    date: NaiveDate,
) -> String {
    pattern
        .replace("{root}", root)
        .replace("{variable}", variable.name())
        .replace("{type}", typ.as_str())
        .replace("{year}", &format!("{:04}", date.year()))
        .replace("{month}", &format!("{:02}", date.month()))
        .replace("{HHMM}", init_time.hhmm())
        .replace("{region}", region)
        .replace("{yyyymmdd}", &yyyymmdd(&date))
}
