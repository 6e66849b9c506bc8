//! Mapping of traffic counts to marker radius and flow-ratio buckets.
//!
//! Radius uses a square-root scale so that circle *area* is proportional to
//! total traffic. The flow ratio (departures / total) is quantized into three
//! buckets: under-served, balanced and over-served.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateResult;
use crate::filter::TimeFilter;
use crate::model::{MarkerStyle, Traffic};

/// Flow-ratio bucket for stations with no traffic.
pub const BALANCED: f64 = 0.5;

/// Continuous scale `y = r0 + (r1 - r0) * (sqrt(x) - sqrt(d0)) / (sqrt(d1) - sqrt(d0))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SqrtScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl SqrtScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Input is clamped to the domain. A zero-width domain maps to the middle
    /// of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = (self.domain.0.sqrt(), self.domain.1.sqrt());
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        let (lo, hi) = if d0 < d1 { (d0, d1) } else { (d1, d0) };
        let x = value.max(0.0).sqrt().clamp(lo, hi);
        r0 + (r1 - r0) * (x - d0) / (d1 - d0)
    }
}

/// Maps a continuous `[0, 1]` domain onto equally sized bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantizeScale {
    pub range: Vec<f64>,
}

impl QuantizeScale {
    pub fn apply(&self, value: f64) -> f64 {
        let n = self.range.len();
        if n == 0 {
            return BALANCED;
        }
        let bin = (value.clamp(0.0, 1.0) * n as f64).floor() as usize;
        self.range[bin.min(n - 1)]
    }
}

impl Default for QuantizeScale {
    fn default() -> Self {
        Self {
            range: vec![0.0, BALANCED, 1.0],
        }
    }
}

/// Pixel radius ranges for the unfiltered and filtered views.
///
/// The filtered view uses a larger range since fewer trips are in play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusPresets {
    #[serde(default = "RadiusPresets::default_unfiltered")]
    pub unfiltered: (f64, f64),
    #[serde(default = "RadiusPresets::default_filtered")]
    pub filtered: (f64, f64),
}

impl Default for RadiusPresets {
    fn default() -> Self {
        Self {
            unfiltered: Self::default_unfiltered(),
            filtered: Self::default_filtered(),
        }
    }
}

impl RadiusPresets {
    fn default_unfiltered() -> (f64, f64) {
        (0.0, 25.0)
    }
    fn default_filtered() -> (f64, f64) {
        (3.0, 50.0)
    }

    pub fn for_filter(&self, filter: TimeFilter) -> (f64, f64) {
        if filter.is_filtered() {
            self.filtered
        } else {
            self.unfiltered
        }
    }
}

/// The radius and flow scales fitted to one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleSet {
    pub radius: SqrtScale,
    pub flow: QuantizeScale,
}

impl ScaleSet {
    /// Fits the radius domain to `[0, max total]` of `aggregate` and picks the
    /// range preset for `filter`.
    pub fn fit(aggregate: &AggregateResult, filter: TimeFilter, presets: &RadiusPresets) -> Self {
        Self {
            radius: SqrtScale::new(
                (0.0, aggregate.max_total() as f64),
                presets.for_filter(filter),
            ),
            flow: QuantizeScale::default(),
        }
    }

    pub fn flow_ratio(&self, traffic: &Traffic) -> f64 {
        if traffic.total_traffic == 0 {
            return BALANCED;
        }
        self.flow
            .apply(traffic.departures as f64 / traffic.total_traffic as f64)
    }

    pub fn style(&self, traffic: &Traffic) -> MarkerStyle {
        MarkerStyle {
            radius: self.radius.apply(traffic.total_traffic as f64),
            flow_ratio: self.flow_ratio(traffic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{Station, Trip};
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sqrt_scale_area_proportional() {
        let scale = SqrtScale::new((0.0, 100.0), (0.0, 25.0));

        assert!(close(scale.apply(0.0), 0.0));
        assert!(close(scale.apply(100.0), 25.0));
        assert!(close(scale.apply(25.0), 12.5));
    }

    #[test]
    fn test_sqrt_scale_clamps_and_offsets() {
        let scale = SqrtScale::new((0.0, 16.0), (3.0, 50.0));

        assert!(close(scale.apply(0.0), 3.0));
        assert!(close(scale.apply(4.0), 3.0 + 47.0 * 0.5));
        assert!(close(scale.apply(1000.0), 50.0));
        assert!(close(scale.apply(-5.0), 3.0));
    }

    #[test]
    fn test_sqrt_scale_degenerate_domain() {
        let scale = SqrtScale::new((0.0, 0.0), (0.0, 25.0));
        assert!(close(scale.apply(0.0), 12.5));
    }

    #[test]
    fn test_quantize_buckets() {
        let q = QuantizeScale::default();

        assert_eq!(q.apply(0.0), 0.0);
        assert_eq!(q.apply(0.2), 0.0);
        assert_eq!(q.apply(0.34), 0.5);
        assert_eq!(q.apply(0.5), 0.5);
        assert_eq!(q.apply(0.66), 0.5);
        assert_eq!(q.apply(0.67), 1.0);
        assert_eq!(q.apply(1.0), 1.0);
        assert_eq!(q.apply(7.0), 1.0);
    }

    #[test]
    fn test_flow_ratio_zero_traffic_is_balanced() {
        let scales = ScaleSet::fit(&AggregateResult::default(), TimeFilter::Any, &RadiusPresets::default());

        assert_eq!(scales.flow_ratio(&Traffic::default()), BALANCED);
        assert_eq!(scales.flow_ratio(&Traffic::new(3, 0)), 0.0);
        assert_eq!(scales.flow_ratio(&Traffic::new(0, 3)), 1.0);
        assert_eq!(scales.flow_ratio(&Traffic::new(2, 2)), 0.5);
    }

    #[test]
    fn test_presets_follow_filter_mode() {
        let presets = RadiusPresets::default();

        assert_eq!(presets.for_filter(TimeFilter::Any), (0.0, 25.0));
        assert_eq!(presets.for_filter(TimeFilter::Minute(0)), (3.0, 50.0));
        assert_eq!(presets.for_filter(TimeFilter::Minute(1439)), (3.0, 50.0));
    }

    #[test]
    fn test_fit_uses_current_max() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let stations = vec![
            Station::new("A", "A", 0.0, 0.0),
            Station::new("B", "B", 0.0, 0.0),
        ];
        let trips = vec![
            Trip {
                start_station_id: "A".into(),
                end_station_id: "B".into(),
                started_at: ts,
                ended_at: ts,
            };
            8
        ];
        let agg = aggregate(&stations, &trips);
        let scales = ScaleSet::fit(&agg, TimeFilter::Minute(720), &RadiusPresets::default());

        assert_eq!(scales.radius.domain, (0.0, 8.0));
        assert_eq!(scales.radius.range, (3.0, 50.0));
        assert!(close(scales.style(&agg.get("A").unwrap()).radius, 50.0));
    }
}
