//! Prometheus metrics for the transfer orchestrator
//!
//! Exposed on /metrics for Prometheus scraping.

#![allow(dead_code)]

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Gauge, Histogram,
};

lazy_static! {
    // Attempt lifecycle
    pub static ref ATTEMPTS_STARTED: CounterVec = register_counter_vec!(
        "bridge_attempts_started_total",
        "Total number of transfer attempts started",
        &["source", "destination"]
    ).unwrap();

    pub static ref ATTEMPTS_SUCCEEDED: CounterVec = register_counter_vec!(
        "bridge_attempts_succeeded_total",
        "Total number of transfer attempts that completed successfully",
        &["source", "destination"]
    ).unwrap();

    pub static ref ATTEMPTS_FAILED: CounterVec = register_counter_vec!(
        "bridge_attempts_failed_total",
        "Total number of transfer attempts that failed",
        &["source", "destination"]
    ).unwrap();

    pub static ref ATTEMPTS_ABORTED: CounterVec = register_counter_vec!(
        "bridge_attempts_aborted_total",
        "Attempts cancelled by a rejected pre-transfer network switch",
        &["source", "destination"]
    ).unwrap();

    // Retry
    pub static ref RETRIES_ATTEMPTED: CounterVec = register_counter_vec!(
        "bridge_retries_attempted_total",
        "Mint-step retries attempted",
        &["outcome"]
    ).unwrap();

    // Engine events
    pub static ref ENGINE_EVENTS: CounterVec = register_counter_vec!(
        "bridge_engine_events_total",
        "Engine progress events received",
        &["method", "state"]
    ).unwrap();

    // Network switches
    pub static ref NETWORK_SWITCHES: CounterVec = register_counter_vec!(
        "bridge_network_switches_total",
        "Wallet network switch requests",
        &["phase", "status"]
    ).unwrap();

    // Attempt latency
    pub static ref ATTEMPT_DURATION: Histogram = register_histogram!(
        "bridge_attempt_duration_seconds",
        "Wall-clock duration of a transfer attempt",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    ).unwrap();

    // Health
    pub static ref UP: Gauge = register_gauge!(
        "bridge_up",
        "Whether the orchestrator is up and running"
    ).unwrap();
}

pub fn record_attempt_started(source: &str, destination: &str) {
    ATTEMPTS_STARTED
        .with_label_values(&[source, destination])
        .inc();
}

pub fn record_attempt_succeeded(source: &str, destination: &str) {
    ATTEMPTS_SUCCEEDED
        .with_label_values(&[source, destination])
        .inc();
}

pub fn record_attempt_failed(source: &str, destination: &str) {
    ATTEMPTS_FAILED
        .with_label_values(&[source, destination])
        .inc();
}

pub fn record_attempt_aborted(source: &str, destination: &str) {
    ATTEMPTS_ABORTED
        .with_label_values(&[source, destination])
        .inc();
}

pub fn record_retry(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    RETRIES_ATTEMPTED.with_label_values(&[outcome]).inc();
}

pub fn record_engine_event(method: &str, state: &str) {
    ENGINE_EVENTS.with_label_values(&[method, state]).inc();
}

pub fn record_network_switch(phase: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    NETWORK_SWITCHES.with_label_values(&[phase, status]).inc();
}

pub fn record_attempt_duration(seconds: f64) {
    ATTEMPT_DURATION.observe(seconds);
}
