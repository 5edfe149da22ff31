//! CloudWatch metrics

use crate::error::from_sdk;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, Metric, MetricDataQuery, MetricStat, StandardUnit};
use chrono::{TimeZone, Utc};
use ecs_deploy_core::{MetricPoint, MetricQuery, MetricsStore, ProviderError, ProviderResult};

const QUERY_ID: &str = "utilized";

#[derive(Debug, Clone)]
pub struct CloudWatchMetrics {
    client: Client,
}

impl CloudWatchMetrics {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn data_query(query: &MetricQuery) -> ProviderResult<MetricDataQuery> {
    let period = i32::try_from(query.period.as_secs())
        .map_err(|_| ProviderError::Rejected(format!("period {:?} is too long", query.period)))?;

    let dimensions = query
        .dimensions
        .iter()
        .map(|(name, value)| Dimension::builder().name(name).value(value).build())
        .collect();

    let metric = Metric::builder()
        .namespace(&query.namespace)
        .metric_name(&query.metric_name)
        .set_dimensions(Some(dimensions))
        .build();

    let stat = MetricStat::builder()
        .metric(metric)
        .period(period)
        .stat("Maximum")
        .set_unit(query.unit.as_deref().map(StandardUnit::from))
        .build();

    Ok(MetricDataQuery::builder()
        .id(QUERY_ID)
        .metric_stat(stat)
        .build())
}

fn to_point(timestamp: &DateTime, value: f64) -> Option<MetricPoint> {
    Utc.timestamp_opt(timestamp.secs(), timestamp.subsec_nanos())
        .single()
        .map(|timestamp| MetricPoint { timestamp, value })
}

#[async_trait]
impl MetricsStore for CloudWatchMetrics {
    async fn query_maximum(&self, query: &MetricQuery) -> ProviderResult<Vec<MetricPoint>> {
        let window = chrono::Duration::from_std(query.window)
            .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        let end = Utc::now();
        let start = end - window;
        let data_query = data_query(query)?;

        let mut points = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .get_metric_data()
                .metric_data_queries(data_query.clone())
                .start_time(DateTime::from_secs(start.timestamp()))
                .end_time(DateTime::from_secs(end.timestamp()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| from_sdk("GetMetricData", e))?;

            for result in output.metric_data_results() {
                if result.id() != Some(QUERY_ID) {
                    continue;
                }
                points.extend(
                    result
                        .timestamps()
                        .iter()
                        .zip(result.values())
                        .filter_map(|(ts, value)| to_point(ts, *value)),
                );
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        tracing::debug!(
            namespace = %query.namespace,
            metric = %query.metric_name,
            samples = points.len(),
            "fetched metric data"
        );
        Ok(points)
    }
}
