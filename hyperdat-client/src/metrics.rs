// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Prometheus metrics for archive clients.

use std::time::Instant;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

#[derive(Clone, Debug)]
pub struct ClientMetrics {
    /// Peers connected to the archive's swarm
    pub peers: IntGauge,
    /// Files downloaded, labeled by mode ("materialize" or "replicate")
    pub files_downloaded: IntCounterVec,
    /// Content bytes pulled through download sinks
    pub bytes_downloaded: IntCounter,
    /// Operation duration in seconds, labeled by operation name
    pub operation_duration: HistogramVec,
}

impl ClientMetrics {
    /// Create new metrics and register them with the given Prometheus registry.
    ///
    /// # Arguments
    /// * `prefix` - Prefix for metric names (e.g., "hyperdat")
    /// * `registry` - Prometheus registry to register metrics with
    pub fn new(prefix: &str, registry: &Registry) -> Result<Self, prometheus::Error> {
        let peers = IntGauge::with_opts(Opts::new(
            format!("{prefix}_archive_peers"),
            "Number of peers connected to the archive swarm",
        ))?;

        let files_downloaded = IntCounterVec::new(
            Opts::new(
                format!("{prefix}_archive_files_downloaded_total"),
                "Total number of archive files downloaded",
            ),
            &["mode"], // "materialize" or "replicate"
        )?;

        let bytes_downloaded = IntCounter::with_opts(Opts::new(
            format!("{prefix}_archive_bytes_downloaded_total"),
            "Total number of archive content bytes downloaded",
        ))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{prefix}_archive_operation_duration_seconds"),
                "Duration of archive client operations",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0,
            ]),
            &["operation"],
        )?;

        registry.register(Box::new(peers.clone()))?;
        registry.register(Box::new(files_downloaded.clone()))?;
        registry.register(Box::new(bytes_downloaded.clone()))?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(ClientMetrics {
            peers,
            files_downloaded,
            bytes_downloaded,
            operation_duration,
        })
    }

    pub(crate) fn observe(&self, operation: &str, started: Instant) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }
}
