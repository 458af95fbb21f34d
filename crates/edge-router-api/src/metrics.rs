//! Prometheus metrics for the edge router.
//!
//! Each [`ServiceMetrics`] owns its own registry, so independent instances
//! (one per test, say) never collide on metric names.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome label values for workflow dispatches.
pub mod dispatch_result {
    pub const SUCCESS: &str = "success";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const MISSING_REF: &str = "missing_ref";
    pub const TRANSPORT_ERROR: &str = "transport_error";
}

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub routed_requests_total: IntCounter,
    pub not_found_total: IntCounter,
    pub webhook_rejections_total: IntCounterVec,
    pub workflow_dispatch_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let routed_requests_total = IntCounter::new(
            "edge_router_requests_total",
            "Requests handed to the route table",
        )?;
        let not_found_total = IntCounter::new(
            "edge_router_not_found_total",
            "Requests answered with 404",
        )?;
        let webhook_rejections_total = IntCounterVec::new(
            Opts::new(
                "edge_router_webhook_rejections_total",
                "Webhook deliveries rejected before reaching their handler",
            ),
            &["kind"],
        )?;
        let workflow_dispatch_total = IntCounterVec::new(
            Opts::new(
                "edge_router_workflow_dispatch_total",
                "Workflow dispatch attempts by outcome",
            ),
            &["result"],
        )?;

        registry.register(Box::new(routed_requests_total.clone()))?;
        registry.register(Box::new(not_found_total.clone()))?;
        registry.register(Box::new(webhook_rejections_total.clone()))?;
        registry.register(Box::new(workflow_dispatch_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            routed_requests_total,
            not_found_total,
            webhook_rejections_total,
            workflow_dispatch_total,
        }))
    }

    pub fn record_webhook_rejection(&self, kind: &str) {
        self.webhook_rejections_total.with_label_values(&[kind]).inc();
    }

    pub fn record_dispatch(&self, result: &str) {
        self.workflow_dispatch_total.with_label_values(&[result]).inc();
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
