use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref FETCH_DURATION: HistogramVec = register_histogram_vec!(
        "triage_fetch_duration_seconds",
        "Backend fetch duration in seconds",
        &["resource", "status"]
    ).unwrap();

    pub static ref REFRESH_CYCLES: IntCounterVec = register_int_counter_vec!(
        "triage_refresh_cycles_total",
        "Total number of refresh cycles by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref COMMAND_COUNTER: IntCounterVec = register_int_counter_vec!(
        "triage_commands_total",
        "Total number of dispatched user commands",
        &["command", "status"]
    ).unwrap();
}

fn status(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

pub fn record_fetch(resource: &str, success: bool, duration: f64) {
    FETCH_DURATION
        .with_label_values(&[resource, status(success)])
        .observe(duration);
}

pub fn record_refresh(outcome: &str) {
    REFRESH_CYCLES.with_label_values(&[outcome]).inc();
}

pub fn record_command(command: &str, success: bool) {
    COMMAND_COUNTER
        .with_label_values(&[command, status(success)])
        .inc();
}

/// Prometheus text exposition of the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_series_appear_in_exposition() {
        record_refresh("partial");
        record_command("export", true);
        record_fetch("stats", false, 0.25);

        let text = render().unwrap();
        assert!(text.contains("triage_refresh_cycles_total{outcome=\"partial\"}"));
        assert!(text.contains("triage_commands_total{command=\"export\",status=\"success\"}"));
        assert!(text.contains("triage_fetch_duration_seconds"));
    }
}
