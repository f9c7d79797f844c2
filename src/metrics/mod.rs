use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::warn;

use crate::Error;
use crate::Result;


lazy_static! {
    pub static ref JOB_POLLS: IntCounterVec = IntCounterVec::new(
        Opts::new("job_polls_total", "Job state polls by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref JOB_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("job_transitions_total", "Observed job state transitions by new state"),
        &["state"]
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATION_DELIVERIES: IntCounterVec = IntCounterVec::new(
        Opts::new("notification_deliveries_total", "Notification deliveries by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref CONFIG_CHANGES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_changes_total", "Config keys changed by reconciliation, by kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = new_registry(None);
}

pub(crate) fn new_registry(prefix: Option<String>) -> Registry {
    let registry = match Registry::new_custom(prefix, None) {
        Ok(registry) => registry,
        Err(e) => {
            warn!("invalid metric prefix, using default registry: {}", e);
            Registry::new()
        }
    };
    register_custom_metrics(&registry);
    registry
}

fn register_custom_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(JOB_POLLS.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(NOTIFICATION_DELIVERIES.clone()),
        Box::new(CONFIG_CHANGES.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!("collector can not be registered: {}", e);
        }
    }
}

/// Renders every toolbox metric in the Prometheus text exposition format
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::Fatal(format!("metrics encoding failed: {e}")))?;
    String::from_utf8(buffer).map_err(|e| Error::Fatal(format!("metrics are not utf-8: {e}")))
}
