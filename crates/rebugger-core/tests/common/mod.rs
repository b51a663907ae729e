//! Shared fixtures for the capture integration tests
#![allow(dead_code)]

use std::sync::Once;

use rebugger_core::{RebugConfig, Rebugger};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness (called once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

pub const DEMO: &str = r#"function add(x, y)
    x + y
end

function mixed(a::T, ::Float64, rest...; scale=2, opts...) where {T<:Integer}
    a * scale
end

function bump!(v)
    push!(v, 99)
    length(v)
end

function outer(n)
    middle(n + 1)
end

function middle(m)
    inner(m * 2)
end

function inner(k)
    if k > 3
        error("too big: ", k)
    end
    k
end
"#;

pub const FLAKY: &str = r#"counter = [0]

function flaky()
    counter[1] = counter[1] + 1
    if counter[1] == 1
        error("first time only")
    end
    counter[1]
end
"#;

/// A session with the demo file loaded as tracked source
pub fn session() -> Rebugger {
    session_with(RebugConfig::default())
}

pub fn session_with(config: RebugConfig) -> Rebugger {
    init_test_logging();
    let mut rebugger = Rebugger::new(config);
    rebugger.include_str("demo.rb", DEMO).expect("demo source loads");
    rebugger
}

/// Byte offset of the first occurrence of `needle`
pub fn at(buffer: &str, needle: &str) -> usize {
    buffer.find(needle).expect("needle present in buffer")
}
