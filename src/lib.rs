#![forbid(unsafe_code)]

//! Retrieve TIGGE ensemble forecasts from the ECMWF Web API.
//!
//! Time periods (`YYYY` or `YYYY-MM`) and variables (`t2m`, `tp`, `gh`) are
//! expanded into one [`RetrievalRequest`] per day, variable, init time
//! (00 and 12 UTC) and forecast type (control `cf`, perturbed `pf`). Each
//! request carries a MARS-like keyword set and a deterministic target path:
//!
//! ```text
//! {root}/{variable}/{type}/{year}/{month}/{HHMM}/{variable}_6hr_ECMWF_{type}_{region}-05_{YYYYMMDD}.grib
//! ```
//!
//! **Quick start**
//! ```no_run
//! use tigge_retrieve::{
//!     enumerate_requests, retrieve_all, ClientOptions, RunOptions, Variable, WebApiClient,
//! };
//!
//! let plan = enumerate_requests(&["2023-01"], &[Variable::T2m, Variable::Gh], 15);
//! for skipped in &plan.skipped {
//!     eprintln!("{skipped}");
//! }
//!
//! let client = WebApiClient::new(ClientOptions::load(None)?)?;
//! let summary = retrieve_all(&client, &plan.requests, &RunOptions::default());
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! # Ok::<(), tigge_retrieve::Error>(())
//! ```
//!
//! Failures are local: a malformed period is skipped during enumeration and a
//! failed retrieval is logged and skipped by [`retrieve_all`].

mod client;
mod enumerate;
mod error;
mod period;
mod request;
mod runner;
mod target;
mod variable;

pub use crate::client::{ClientOptions, Retrieve, Retrieved, WebApiClient, default_rc_path};
pub use crate::enumerate::{
    Enumeration, SkipReason, SkippedPeriod, enumerate_requests, enumerate_requests_with,
};
pub use crate::error::{Error, Result};
pub use crate::period::{days_inclusive, last_day_of_month, parse_time_period};
pub use crate::request::{
    ENSEMBLE_MEMBERS, ForecastType, InitTime, Request, RequestValue, RetrievalRequest, step_list,
};
pub use crate::runner::{RunOptions, Summary, retrieve_all};
pub use crate::target::{DEFAULT_REGION, DEFAULT_ROOT, TargetLayout};
pub use crate::variable::{GH_LEVEL_HPA, LevelType, Variable};
