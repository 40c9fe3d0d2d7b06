//! Tests for utility functions

use retry_lot::util::{init_tracing, now_ms, DEFAULT_DIRECTIVES};
use tracing_subscriber::EnvFilter;

#[test]
fn test_now_ms_is_monotonic_enough() {
    let first = now_ms();
    let second = now_ms();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice without panicking");
}

#[test]
fn test_default_directives_parse_and_name_the_crate() {
    let filter = EnvFilter::try_new(DEFAULT_DIRECTIVES).expect("valid directives");
    let rendered = filter.to_string();
    assert!(rendered.contains("retry_lot=info"), "{rendered}");
    assert!(rendered.contains("warn"), "{rendered}");
}
