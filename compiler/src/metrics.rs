use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every thread using a compiler.
#[derive(Debug, Default)]
pub struct Metrics {
    parses: AtomicU64,
    parse_errors: AtomicU64,
    repairs: AtomicU64,
    renders: AtomicU64,
    render_errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    plugin_errors: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub parses: u64,
    pub parse_errors: u64,
    pub repairs: u64,
    pub renders: u64,
    pub render_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub plugin_errors: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
    pub(crate) fn parsed(&self) {
        bump(&self.parses)
    }

    pub(crate) fn parse_failed(&self) {
        bump(&self.parse_errors)
    }

    pub(crate) fn repaired(&self) {
        bump(&self.repairs)
    }

    pub(crate) fn rendered(&self) {
        bump(&self.renders)
    }

    pub(crate) fn render_failed(&self) {
        bump(&self.render_errors)
    }

    pub(crate) fn cache_hit(&self) {
        bump(&self.cache_hits)
    }

    pub(crate) fn cache_miss(&self) {
        bump(&self.cache_misses)
    }

    pub(crate) fn plugin_failed(&self) {
        bump(&self.plugin_errors)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            parses: read(&self.parses),
            parse_errors: read(&self.parse_errors),
            repairs: read(&self.repairs),
            renders: read(&self.renders),
            render_errors: read(&self.render_errors),
            cache_hits: read(&self.cache_hits),
            cache_misses: read(&self.cache_misses),
            plugin_errors: read(&self.plugin_errors),
        }
    }
}
