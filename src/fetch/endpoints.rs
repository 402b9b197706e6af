//! Backend routes consumed by the statistics charts
//!
//! Each chart requests one endpoint with a fixed default parameter set. The
//! keys those default requests derive are the "well-known" cache keys shown
//! by the diagnostic panel.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cache::{create_key_from_params, QueryParams};

/// A statistics endpoint of the backend API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Mean drag coefficient and home run count per period
    DragVsHr,
    /// Exit velocity against hit distance for a batted-ball sample
    ExitVelocityDistance,
    /// Physics-model expected distance against measured distance
    ExpectedVsActualDistance,
    /// Pitch speed against exit velocity
    PitchVsExitVelocity,
    /// Summary statistics of the drag coefficient
    DragCoefficientStats,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::DragVsHr,
        Endpoint::ExitVelocityDistance,
        Endpoint::ExpectedVsActualDistance,
        Endpoint::PitchVsExitVelocity,
        Endpoint::DragCoefficientStats,
    ];

    /// Short name, as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::DragVsHr => "drag_vs_hr",
            Endpoint::ExitVelocityDistance => "exit_velocity_distance",
            Endpoint::ExpectedVsActualDistance => "expected_vs_actual_distance",
            Endpoint::PitchVsExitVelocity => "pitch_vs_exit_velocity",
            Endpoint::DragCoefficientStats => "drag_coefficient_stats",
        }
    }

    /// Looks up an endpoint by short name, with or without a leading `/`
    pub fn from_name(s: &str) -> Option<Self> {
        let name = s.trim().trim_start_matches('/');
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == name)
    }

    /// Request path relative to the API base URL
    pub fn path(&self) -> String {
        format!("/{}", self.name())
    }

    /// Parameters the corresponding chart sends by default
    pub fn default_params(&self) -> QueryParams {
        match self {
            Endpoint::DragVsHr => QueryParams::new().with("granularity", "month"),
            Endpoint::ExitVelocityDistance => QueryParams::new().with("sampleSize", 1000),
            Endpoint::PitchVsExitVelocity => QueryParams::new()
                .with("start_date", "2015-01-01")
                .with("end_date", "2025-01-01")
                .with("min_release_speed", 30)
                .with("max_release_speed", 110)
                .with("min_launch_speed", 40)
                .with("max_launch_speed", 130),
            Endpoint::ExpectedVsActualDistance | Endpoint::DragCoefficientStats => {
                QueryParams::new()
            }
        }
    }

    /// Cache key of a request to this endpoint with `params`
    pub fn cache_key(&self, params: &QueryParams) -> String {
        create_key_from_params(&self.path(), params)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unrecognized endpoint name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown endpoint: {0}")]
pub struct UnknownEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::from_name(s).ok_or_else(|| UnknownEndpoint(s.to_string()))
    }
}

/// Keys of the default chart requests, yearly drag_vs_hr included
pub fn common_cache_keys() -> Vec<String> {
    let mut keys = Vec::new();
    for endpoint in Endpoint::ALL {
        keys.push(endpoint.cache_key(&endpoint.default_params()));
        if endpoint == Endpoint::DragVsHr {
            let yearly = QueryParams::new().with("granularity", "year");
            keys.push(endpoint.cache_key(&yearly));
        }
    }
    keys
}
