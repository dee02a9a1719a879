use chrono::Datelike;
use log::warn;

use crate::error::Error;
use crate::period::{days_inclusive, last_day_of_month, parse_time_period};
use crate::request::{ForecastType, InitTime, RetrievalRequest};
use crate::target::TargetLayout;
use crate::variable::Variable;

/// A period that produced no requests, with the reason.
#[derive(Debug)]
pub struct SkippedPeriod {
    pub period: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub enum SkipReason {
    InvalidFormat(Error),
    /// `start_day` lies past the last day of a one-month period.
    StartDayPastEnd { start_day: u32 },
    /// `start_day` is 0 or does not exist in the period's first month.
    NoSuchStartDay { start_day: u32 },
}

impl std::fmt::Display for SkippedPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            SkipReason::InvalidFormat(e) => write!(f, "{e}"),
            SkipReason::StartDayPastEnd { start_day } => write!(
                f,
                "Start day {start_day} is after the end of the period for {}. Skipping.",
                self.period
            ),
            SkipReason::NoSuchStartDay { start_day } => write!(
                f,
                "Start day {start_day} is not a day of the first month of {}. Skipping.",
                self.period
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct Enumeration {
    pub requests: Vec<RetrievalRequest>,
    pub skipped: Vec<SkippedPeriod>,
}

/// Enumerate requests using the default archive layout.
pub fn enumerate_requests<S: AsRef<str>>(
    periods: &[S],
    variables: &[Variable],
    start_day: u32,
) -> Enumeration {
    enumerate_requests_with(&TargetLayout::default(), periods, variables, start_day)
}

/// Expand periods into one request per day x variable x init time x forecast type.
///
/// Malformed periods and periods whose `start_day` is 0, missing from the first
/// month, or past their end are logged and recorded in [`Enumeration::skipped`]; the rest are still expanded.
pub fn enumerate_requests_with<S: AsRef<str>>(
    layout: &TargetLayout,
    periods: &[S],
    variables: &[Variable],
    start_day: u32,
) -> Enumeration {
    let mut out = Enumeration::default();

    for period in periods {
        let period = period.as_ref();

        let (start, end) = match parse_time_period(period) {
            Ok(range) => range,
            Err(e) => {
                warn!("{e}");
                out.skipped.push(SkippedPeriod {
                    period: period.to_string(),
                    reason: SkipReason::InvalidFormat(e),
                });
                continue;
            }
        };

        let start = match start.with_day(start_day) {
            Some(d) if d <= end => d,
            _ => {
                let single_month = last_day_of_month(start) == Some(end);
                let reason = if start_day > 0 && single_month {
                    SkipReason::StartDayPastEnd { start_day }
                } else {
                    SkipReason::NoSuchStartDay { start_day }
                };
                let skipped = SkippedPeriod {
                    period: period.to_string(),
                    reason,
                };
                warn!("{skipped}");
                out.skipped.push(skipped);
                continue;
            }
        };

        for date in days_inclusive(start, end) {
            for &variable in variables {
                for init_time in InitTime::ALL {
                    for typ in ForecastType::ALL {
                        out.requests
                            .push(RetrievalRequest::new(date, variable, init_time, typ, layout));
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn start_day_trims_the_month() {
        let e = enumerate_requests(&["2023-01"], &[Variable::T2m], 15);
        assert!(e.skipped.is_empty());
        assert_eq!(e.requests.len(), 17 * 4);

        let days: Vec<u32> = e.requests.iter().map(|r| r.date().day()).collect();
        assert_eq!(days.iter().min(), Some(&15));
        assert_eq!(days.iter().max(), Some(&31));
    }

    #[test]
    fn start_day_past_period_end_is_skipped() {
        let e = enumerate_requests(&["2023-02"], &[Variable::T2m], 30);
        assert!(e.requests.is_empty());
        assert_eq!(e.skipped.len(), 1);
        assert!(matches!(
            e.skipped[0].reason,
            SkipReason::StartDayPastEnd { start_day: 30 }
        ));
        assert_eq!(
            e.skipped[0].to_string(),
            "Start day 30 is after the end of the period for 2023-02. Skipping."
        );
    }

    #[test]
    fn invalid_period_does_not_stop_others() {
        let e = enumerate_requests(&["abc", "2023-02"], &[Variable::Tp], 28);
        assert_eq!(e.skipped.len(), 1);
        assert_eq!(e.skipped[0].period, "abc");
        assert!(matches!(
            e.skipped[0].reason,
            SkipReason::InvalidFormat(Error::InvalidPeriodFormat(_))
        ));
        assert_eq!(e.requests.len(), 4);
    }

    #[test]
    fn year_period_shifts_january_only() {
        let e = enumerate_requests(&["2024"], &[Variable::T2m], 31);
        // Jan 31 through Dec 31 of a leap year.
        let first = e.requests.first().map(|r| r.date());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(e.requests.len(), (366 - 30) * 4);
    }

    #[test]
    fn nesting_order_is_day_variable_time_type() {
        let e = enumerate_requests(&["2023-01"], &[Variable::T2m, Variable::Gh], 31);
        let keys: Vec<(Variable, InitTime, ForecastType)> = e
            .requests
            .iter()
            .map(|r| (r.variable(), r.init_time(), r.forecast_type()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Variable::T2m, InitTime::H00, ForecastType::Control),
                (Variable::T2m, InitTime::H00, ForecastType::Perturbed),
                (Variable::T2m, InitTime::H12, ForecastType::Control),
                (Variable::T2m, InitTime::H12, ForecastType::Perturbed),
                (Variable::Gh, InitTime::H00, ForecastType::Control),
                (Variable::Gh, InitTime::H00, ForecastType::Perturbed),
                (Variable::Gh, InitTime::H12, ForecastType::Control),
                (Variable::Gh, InitTime::H12, ForecastType::Perturbed),
            ]
        );
    }

    #[test]
    fn only_gh_requests_carry_level_500() {
        let e = enumerate_requests(
            &["2023-03"],
            &[Variable::T2m, Variable::Tp, Variable::Gh],
            1,
        );
        assert_eq!(e.requests.len(), 31 * 3 * 4);
        for r in &e.requests {
            let levelist = r.to_request().get("levelist").map(|v| v.joined());
            match r.variable() {
                Variable::Gh => assert_eq!(levelist.as_deref(), Some("500")),
                _ => assert_eq!(levelist, None),
            }
        }
    }

    #[test]
    fn targets_are_distinct() {
        let e = enumerate_requests(&["2023-01"], &Variable::ALL, 1);
        let mut targets: Vec<_> = e.requests.iter().map(|r| r.target_path().to_path_buf()).collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), e.requests.len());
    }

    #[test]
    fn start_day_zero_is_not_a_day() {
        let e = enumerate_requests(&["2023-01"], &[Variable::T2m], 0);
        assert!(e.requests.is_empty());
        assert_eq!(e.skipped.len(), 1);
        assert!(matches!(
            e.skipped[0].reason,
            SkipReason::NoSuchStartDay { start_day: 0 }
        ));
        assert_eq!(
            e.skipped[0].to_string(),
            "Start day 0 is not a day of the first month of 2023-01. Skipping."
        );
    }

    #[test]
    fn start_day_past_january_skips_whole_year() {
        let e = enumerate_requests(&["2023", "2023-03"], &[Variable::Gh], 32);
        assert!(e.requests.is_empty());
        assert!(matches!(
            e.skipped[0].reason,
            SkipReason::NoSuchStartDay { start_day: 32 }
        ));
        assert!(matches!(
            e.skipped[1].reason,
            SkipReason::StartDayPastEnd { start_day: 32 }
        ));
    }
}
