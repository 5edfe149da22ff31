//! Memory reservation estimate
//!
//! Looks at the hourly maximum of Container Insights `MemoryUtilized` over a
//! window, averages the samples per hour of day, takes the busiest hour and
//! leaves 20% headroom on top of it.

use crate::error::{DeployError, Result};
use crate::provider::{MetricPoint, MetricQuery, MetricsStore};
use chrono::Timelike;
use std::time::Duration;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(90 * 24 * 60 * 60);

const NAMESPACE: &str = "ECS/ContainerInsights";
const METRIC: &str = "MemoryUtilized";
const UNIT: &str = "Megabytes";
const PERIOD: Duration = Duration::from_secs(3600);
const TARGET_UTILIZATION: f64 = 0.8;

/// Query for the memory usage of task family `family` in `cluster`
pub fn memory_query(cluster: &str, family: &str, window: Duration) -> MetricQuery {
    MetricQuery {
        namespace: NAMESPACE.to_string(),
        metric_name: METRIC.to_string(),
        dimensions: vec![
            ("TaskDefinitionFamily".to_string(), family.to_string()),
            ("ClusterName".to_string(), cluster.to_string()),
        ],
        unit: Some(UNIT.to_string()),
        period: PERIOD,
        window,
    }
}

/// Recommended reservation in MiB; 0 when there are no samples.
pub fn calculate_reservation(points: &[MetricPoint]) -> i32 {
    let mut sums = [0.0_f64; 24];
    let mut counts = [0_u32; 24];

    for point in points {
        let hour = point.timestamp.hour() as usize;
        sums[hour] += point.value;
        counts[hour] += 1;
    }

    let busiest = sums
        .iter()
        .zip(counts.iter())
        .filter(|(_, count)| **count > 0)
        .map(|(sum, count)| sum / f64::from(*count))
        .fold(0.0_f64, f64::max);

    (busiest / TARGET_UTILIZATION).round() as i32
}

/// Fetch usage for `family` in `cluster` and turn it into a recommendation.
pub async fn estimate_reservation(
    metrics: &dyn MetricsStore,
    cluster: &str,
    family: &str,
    window: Duration,
) -> Result<i32> {
    let query = memory_query(cluster, family, window);
    let points = metrics
        .query_maximum(&query)
        .await
        .map_err(|e| DeployError::EstimationFailed(e.to_string()))?;

    let reservation = calculate_reservation(&points);
    tracing::debug!(
        %cluster,
        %family,
        samples = points.len(),
        reservation,
        "estimated memory reservation"
    );
    Ok(reservation)
}
