//! Webserver metrics.
//!
//! # Metrics
//! - `webserver_requests_total` (counter): dispatched requests by method, status
//! - `webserver_request_duration_seconds` (histogram): dispatch latency
//! - `webserver_unhandled_total` (counter): requests no outlet accepted
//! - `webserver_lifecycle_events_total` (counter): start/stop transitions
//! - `webserver_middlewares_woven` (gauge): descriptors mounted by the last weave

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!("webserver_requests_total", "Requests dispatched to outlets");
    describe_histogram!(
        "webserver_request_duration_seconds",
        "Time spent dispatching a request"
    );
    describe_counter!("webserver_unhandled_total", "Requests no outlet accepted");
    describe_counter!(
        "webserver_lifecycle_events_total",
        "Webserver lifecycle transitions"
    );
    describe_gauge!(
        "webserver_middlewares_woven",
        "Middleware descriptors mounted by the last weave"
    );
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "webserver_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("webserver_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_unhandled() {
    counter!("webserver_unhandled_total").increment(1);
}

pub fn record_lifecycle(event: &'static str) {
    counter!("webserver_lifecycle_events_total", "event" => event).increment(1);
}

pub fn record_woven(count: usize) {
    gauge!("webserver_middlewares_woven").set(count as f64);
}
