use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::period::iso_date;
use crate::target::TargetLayout;
use crate::variable::{LevelType, Variable};

/// Last forecast step retrieved, in hours.
pub const MAX_STEP_HOURS: u32 = 360;
pub const STEP_INTERVAL_HOURS: u32 = 6;
/// Number of perturbed ensemble members.
pub const ENSEMBLE_MEMBERS: u32 = 50;

/// Value type for a request keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestValue {
    Str(String),
    Int(i64),
    IntList(Vec<i64>),
}

impl From<&str> for RequestValue {
    fn from(value: &str) -> Self {
        RequestValue::Str(value.to_string())
    }
}

impl From<String> for RequestValue {
    fn from(value: String) -> Self {
        RequestValue::Str(value)
    }
}

impl From<u32> for RequestValue {
    fn from(value: u32) -> Self {
        RequestValue::Int(value as i64)
    }
}

impl From<&[u32]> for RequestValue {
    fn from(value: &[u32]) -> Self {
        RequestValue::IntList(value.iter().map(|&x| x as i64).collect())
    }
}

impl RequestValue {
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            RequestValue::Str(s) => vec![s.clone()],
            RequestValue::Int(i) => vec![i.to_string()],
            RequestValue::IntList(xs) => xs.iter().map(|x| x.to_string()).collect(),
        }
    }

    /// MARS list syntax: `a/b/c`.
    pub fn joined(&self) -> String {
        self.as_strings().join("/")
    }
}

/// MARS-like request expressed as keyword/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    inner: BTreeMap<String, RequestValue>,
}

impl Request {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Insert a keyword/value pair (value can be a scalar or list).
    pub fn kw(mut self, key: impl Into<String>, value: impl Into<RequestValue>) -> Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&RequestValue> {
        self.inner.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Flat JSON object with every value rendered in MARS list syntax.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .inner
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.joined())))
            .collect();
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitTime {
    H00,
    H12,
}

impl InitTime {
    pub const ALL: [InitTime; 2] = [InitTime::H00, InitTime::H12];

    pub fn as_str(self) -> &'static str {
        match self {
            InitTime::H00 => "00:00:00",
            InitTime::H12 => "12:00:00",
        }
    }

    pub fn hhmm(self) -> &'static str {
        match self {
            InitTime::H00 => "0000",
            InitTime::H12 => "1200",
        }
    }
}

impl fmt::Display for InitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastType {
    /// Unperturbed control run.
    Control,
    /// Perturbed ensemble members.
    Perturbed,
}

impl ForecastType {
    pub const ALL: [ForecastType; 2] = [ForecastType::Control, ForecastType::Perturbed];

    pub fn as_str(self) -> &'static str {
        match self {
            ForecastType::Control => "cf",
            ForecastType::Perturbed => "pf",
        }
    }

    pub fn ensemble_numbers(self) -> Vec<u32> {
        match self {
            ForecastType::Control => Vec::new(),
            ForecastType::Perturbed => (1..=ENSEMBLE_MEMBERS).collect(),
        }
    }
}

impl fmt::Display for ForecastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `0, 6, ..., 360`.
pub fn step_list() -> Vec<u32> {
    (0..=MAX_STEP_HOURS)
        .step_by(STEP_INTERVAL_HOURS as usize)
        .collect()
}

/// One archive retrieval: a single day, variable, init time and forecast type.
///
/// Level and ensemble members are derived from the variable and forecast type,
/// so they always agree with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    date: NaiveDate,
    variable: Variable,
    init_time: InitTime,
    forecast_type: ForecastType,
    ensemble_numbers: Vec<u32>,
    step_list: Vec<u32>,
    target_path: PathBuf,
}

impl RetrievalRequest {
    pub fn new(
        date: NaiveDate,
        variable: Variable,
        init_time: InitTime,
        forecast_type: ForecastType,
        layout: &TargetLayout,
    ) -> Self {
        Self {
            date,
            variable,
            init_time,
            forecast_type,
            ensemble_numbers: forecast_type.ensemble_numbers(),
            step_list: step_list(),
            target_path: layout.target_path(variable, forecast_type, init_time, date),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn level_type(&self) -> LevelType {
        self.variable.level_type()
    }

    pub fn level(&self) -> Option<u32> {
        self.variable.level()
    }

    pub fn init_time(&self) -> InitTime {
        self.init_time
    }

    pub fn forecast_type(&self) -> ForecastType {
        self.forecast_type
    }

    pub fn ensemble_numbers(&self) -> &[u32] {
        &self.ensemble_numbers
    }

    pub fn step_list(&self) -> &[u32] {
        &self.step_list
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Render the keyword/value description the archive accepts.
    pub fn to_request(&self) -> Request {
        let mut r = Request::new()
            .kw("class", "ti")
            .kw("dataset", "tigge")
            .kw("expver", "prod")
            .kw("grid", "0.5/0.5")
            .kw("date", iso_date(&self.date))
            .kw("levtype", self.level_type().as_str())
            .kw("origin", "ecmf")
            .kw("param", self.variable.param_code())
            .kw("step", self.step_list.as_slice())
            .kw("time", self.init_time.as_str())
            .kw("type", self.forecast_type.as_str())
            .kw("target", self.target_path.to_string_lossy().into_owned());

        if let Some(level) = self.level() {
            r = r.kw("levelist", level);
        }
        if !self.ensemble_numbers.is_empty() {
            r = r.kw("number", self.ensemble_numbers.as_slice());
        }
        r
    }
}

impl fmt::Display for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            iso_date(&self.date),
            self.variable,
            self.init_time,
            self.forecast_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(variable: Variable, typ: ForecastType) -> RetrievalRequest {
        let date = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        RetrievalRequest::new(date, variable, InitTime::H00, typ, &TargetLayout::default())
    }

    #[test]
    fn step_list_is_six_hourly_to_360() {
        let steps = step_list();
        assert_eq!(steps.len(), 61);
        assert_eq!(steps.first(), Some(&0));
        assert_eq!(steps.last(), Some(&360));
        assert!(steps.windows(2).all(|w| w[1] - w[0] == 6));
    }

    #[test]
    fn control_has_no_members_perturbed_has_fifty() {
        assert!(request(Variable::T2m, ForecastType::Control).ensemble_numbers().is_empty());
        let pf = request(Variable::T2m, ForecastType::Perturbed);
        assert_eq!(pf.ensemble_numbers(), (1..=50).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn renders_mars_keywords() {
        let r = request(Variable::Gh, ForecastType::Perturbed).to_request();
        let s = |k: &str| r.get(k).map(|v| v.joined());

        assert_eq!(s("class").as_deref(), Some("ti"));
        assert_eq!(s("dataset").as_deref(), Some("tigge"));
        assert_eq!(s("grid").as_deref(), Some("0.5/0.5"));
        assert_eq!(s("date").as_deref(), Some("2023-01-15"));
        assert_eq!(s("levtype").as_deref(), Some("pl"));
        assert_eq!(s("levelist").as_deref(), Some("500"));
        assert_eq!(s("param").as_deref(), Some("156"));
        assert_eq!(s("time").as_deref(), Some("00:00:00"));
        assert_eq!(s("type").as_deref(), Some("pf"));
        assert!(s("step").unwrap().starts_with("0/6/12/"));
        assert!(s("step").unwrap().ends_with("/354/360"));
        assert!(s("number").unwrap().starts_with("1/2/3/"));
        assert!(s("number").unwrap().ends_with("/50"));
        assert_eq!(
            s("target").as_deref(),
            Some("/g/data/xv83/TIGGE/data/ECMWF/gh/pf/2023/01/0000/gh_6hr_ECMWF_pf_GLO-05_20230115.grib")
        );
    }

    #[test]
    fn surface_control_omits_level_and_members() {
        let r = request(Variable::Tp, ForecastType::Control).to_request();
        assert!(!r.contains("levelist"));
        assert!(!r.contains("number"));
        assert_eq!(r.get("levtype"), Some(&RequestValue::Str("sfc".into())));
    }

    #[test]
    fn json_values_are_flat_strings() {
        let v = request(Variable::T2m, ForecastType::Control).to_request().to_json();
        assert_eq!(v["param"], "167");
        assert_eq!(v["origin"], "ecmf");
        assert!(v["step"].is_string());
    }
}
