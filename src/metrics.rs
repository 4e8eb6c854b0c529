use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::models::messages::RouteStatus;

const METRIC_NAMESPACE: &str = "SplitRouter";
const METRIC_ROUTE_COMPLETION: &str = "RouteCompletion";
const METRIC_ROUTE_TIMEOUT: &str = "RouteRequestTimeout";
const METRIC_MAX_SPLITS_REACHED: &str = "MaxSplitsReached";
const METRIC_GAS_MODEL_DEGRADED: &str = "GasModelDegraded";
const METRIC_SEARCH_LATENCY: &str = "SplitSearchLatency";
const DIM_STATUS: &str = "Status";
const DIM_SPLITS: &str = "Splits";
const DIM_TOKEN: &str = "Token";

pub fn emit_route_completion(status: RouteStatus, splits: usize) {
    emit_metric(
        METRIC_ROUTE_COMPLETION,
        "Count",
        json!(1),
        &[
            (DIM_STATUS, json!(status)),
            (DIM_SPLITS, json!(splits.to_string())),
        ],
    );
}

pub fn emit_route_timeout() {
    emit_metric(METRIC_ROUTE_TIMEOUT, "Count", json!(1), &[]);
}

pub fn emit_max_splits_reached(splits: usize) {
    emit_metric(
        METRIC_MAX_SPLITS_REACHED,
        "Count",
        json!(1),
        &[(DIM_SPLITS, json!(splits.to_string()))],
    );
}

pub fn emit_gas_model_degraded(token_symbol: &str) {
    emit_metric(
        METRIC_GAS_MODEL_DEGRADED,
        "Count",
        json!(1),
        &[(DIM_TOKEN, json!(token_symbol))],
    );
}

pub fn emit_search_latency(latency_ms: u64) {
    emit_metric(METRIC_SEARCH_LATENCY, "Milliseconds", json!(latency_ms), &[]);
}

fn emit_metric(metric_name: &str, unit: &str, value: Value, dimensions: &[(&str, Value)]) {
    // CloudWatch Embedded Metric Format, written straight to stdout so the
    // tracing formatter cannot wrap it.
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0);

    let event = build_emf_event(metric_name, unit, value, dimensions, timestamp_ms);

    match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, metric = metric_name, "Failed to serialize EMF metric"),
    }
}

fn build_emf_event(
    metric_name: &str,
    unit: &str,
    value: Value,
    dimensions: &[(&str, Value)],
    timestamp_ms: i64,
) -> Value {
    let dimension_names: Vec<&str> = dimensions.iter().map(|(name, _)| *name).collect();
    let aws = json!({
        "Timestamp": timestamp_ms,
        "CloudWatchMetrics": [{
            "Namespace": METRIC_NAMESPACE,
            "Dimensions": [dimension_names],
            "Metrics": [{
                "Name": metric_name,
                "Unit": unit,
            }],
        }],
    });

    let mut event = Map::new();
    event.insert("_aws".to_string(), aws);
    event.insert(metric_name.to_string(), value);
    for (name, value) in dimensions {
        event.insert((*name).to_string(), value.clone());
    }
    Value::Object(event)
}
