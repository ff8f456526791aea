//!
//! Collection of types returned from the APIs.
//!
//! NOTE: The types here are not exhaustive to the APIs.
use serde::Deserialize;

/// Listing endpoints wrap their items in `results`
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    /// Items, missing or `null` when there is nothing to list
    pub results: Option<Vec<T>>,
}

impl<T> Page<T> {
    /// Items of the page, empty when the field was absent
    #[must_use]
    pub fn into_results(self) -> Vec<T> {
        self.results.unwrap_or_default()
    }
}

/// Returned from /groups
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    /// Project (group) id
    pub id: String,
    /// Project name
    #[serde(default)]
    pub name: String,
}

/// Memory and CPU of a host
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(rename = "memSizeMB", default)]
    pub mem_size_mb: u64,
    #[serde(default)]
    pub num_cores: u64,
}

/// Returned from /groups/{id}/processes and /groups/{id}/hosts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// Host or process id
    pub id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub replica_set_name: Option<String>,
    /// Role of the node, `REPLICA_PRIMARY`, `SHARD_MONGOS`, ...
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub system_info: Option<SystemInfo>,
}

impl Host {
    /// Replica set name or `N/A`
    #[must_use]
    pub fn replica_set(&self) -> &str {
        self.replica_set_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("N/A")
    }

    /// Node role or `UNKNOWN`
    #[must_use]
    pub fn node_type(&self) -> &str {
        self.type_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("UNKNOWN")
    }

    /// System info, zeroed when the API doesn't report it
    #[must_use]
    pub fn system_info(&self) -> SystemInfo {
        self.system_info.unwrap_or_default()
    }
}

/// Returned from .../disks
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiskPartition {
    pub partition_name: String,
}

/// A single sample, `value` is `null` for gaps in the series
#[derive(Debug, Clone, Deserialize)]
pub struct DataPoint {
    /// Kept as sent, samples are reduced without looking at it
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A named time series
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub name: String,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
}

impl Measurement {
    /// Sample values, gaps skipped
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data_points.iter().filter_map(|dp| dp.value)
    }
}

/// Returned from .../measurements
#[derive(Debug, Deserialize)]
pub struct Measurements {
    pub measurements: Option<Vec<Measurement>>,
}

impl Measurements {
    /// Series of the response, empty when the field was absent
    #[must_use]
    pub fn into_measurements(self) -> Vec<Measurement> {
        self.measurements.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn host_defaults() {
        let host: Host = serde_json::from_value(json!({
            "id": "h1",
            "hostname": "node-1.example.net",
            "replicaSetName": ""
        }))
        .unwrap();
        assert_eq!(host.replica_set(), "N/A");
        assert_eq!(host.node_type(), "UNKNOWN");
        assert_eq!(host.system_info(), SystemInfo::default());
    }

    #[test]
    fn host_from_ops_manager() {
        let host: Host = serde_json::from_value(json!({
            "id": "b8b0e4fd",
            "hostname": "node-2.example.net",
            "port": 27017,
            "replicaSetName": "rs0",
            "typeName": "REPLICA_SECONDARY",
            "systemInfo": { "memSizeMB": 16384, "numCores": 8 }
        }))
        .unwrap();
        assert_eq!(host.replica_set(), "rs0");
        assert_eq!(host.node_type(), "REPLICA_SECONDARY");
        assert_eq!(
            host.system_info(),
            SystemInfo {
                mem_size_mb: 16384,
                num_cores: 8
            }
        );
    }

    #[test]
    fn missing_and_null_results() {
        let page: Page<Project> = serde_json::from_value(json!({})).unwrap();
        assert!(page.into_results().is_empty());

        let page: Page<Project> = serde_json::from_value(json!({ "results": null })).unwrap();
        assert!(page.into_results().is_empty());

        let page: Measurements =
            serde_json::from_value(json!({ "measurements": null })).unwrap();
        assert!(page.into_measurements().is_empty());
    }

    #[test]
    fn measurement_skips_gaps() {
        let m: Measurement = serde_json::from_value(json!({
            "name": "SYSTEM_MEMORY_USED",
            "units": "BYTES",
            "dataPoints": [
                { "timestamp": "2024-05-01T00:00:00Z", "value": 1.5 },
                { "timestamp": "2024-05-01T01:00:00Z", "value": null },
                { "timestamp": "2024-05-01T02:00:00Z", "value": 3 }
            ]
        }))
        .unwrap();
        assert_eq!(m.values().collect::<Vec<_>>(), vec![1.5, 3.0]);
    }

    #[test]
    fn odd_timestamps_do_not_fail_the_response() {
        let page: Measurements = serde_json::from_value(json!({
            "measurements": [{
                "name": "OPCOUNTERS_QUERY",
                "dataPoints": [
                    { "timestamp": "yesterday", "value": 2 },
                    { "value": 4 }
                ]
            }]
        }))
        .unwrap();
        let measurements = page.into_measurements();
        assert_eq!(measurements[0].values().collect::<Vec<_>>(), vec![2.0, 4.0]);
        assert_eq!(measurements[0].data_points[0].timestamp.as_deref(), Some("yesterday"));
    }

    #[test]
    fn results_without_default_items() {
        let page: Page<DiskPartition> = serde_json::from_value(json!({
            "results": [{ "partitionName": "data" }]
        }))
        .unwrap();
        assert_eq!(page.into_results()[0].partition_name, "data");
    }
}
