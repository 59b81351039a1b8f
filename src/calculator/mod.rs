use serde::Serialize;
use std::fmt;

use crate::variables::{ConfigurationSet, Variable, GLOBAL_VARIABLES, PER_CONNECTION_VARIABLES};

/// Buffer pool sizes below this trigger [`Warning::BufferPoolBelowMinimum`].
pub const MIN_BUFFER_POOL_BYTES: u64 = 134_217_728;
/// Connection counts above this trigger [`Warning::HighConnectionCount`].
pub const MAX_CONNECTIONS_ADVISORY: u64 = 1000;
/// Sort buffers above this trigger [`Warning::LargeSortBuffer`].
pub const MAX_SORT_BUFFER_BYTES: u64 = 262_144;
/// Fraction of server RAM the total may use before [`Warning::ServerMemoryExceeded`].
pub const SERVER_MEMORY_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemoryTotals {
    pub global_buffers: u64,
    /// One connection's worth of buffers.
    pub per_connection_buffers: u64,
    pub total_per_connection: u64,
    pub total: u64,
}

/// Share of the total taken by each half, in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Distribution {
    pub global: f64,
    pub per_connection: f64,
}

impl MemoryTotals {
    /// Total as a percentage of `server_bytes`; `None` without a positive figure.
    pub fn server_usage_percent(&self, server_bytes: Option<f64>) -> Option<f64> {
        server_bytes.filter(|s| s.is_finite() && *s > 0.0).map(|s| self.total as f64 / s * 100.0)
    }

    pub fn distribution(&self) -> Distribution {
        if self.total == 0 {
            return Distribution::default();
        }
        let total = self.total as f64;
        Distribution {
            global: self.global_buffers as f64 / total,
            per_connection: self.total_per_connection as f64 / total,
        }
    }
}

pub fn compute_totals(config: &ConfigurationSet) -> MemoryTotals {
    let sum = |keys: &[Variable]| {
        keys.iter().fold(0u64, |acc, v| acc.saturating_add(config.get(*v)))
    };
    let global_buffers = sum(&GLOBAL_VARIABLES[..]);
    let per_connection_buffers = sum(&PER_CONNECTION_VARIABLES[..]);
    let total_per_connection = per_connection_buffers.saturating_mul(config.max_connections);
    MemoryTotals {
        global_buffers,
        per_connection_buffers,
        total_per_connection,
        total: global_buffers.saturating_add(total_per_connection),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    ServerMemoryExceeded,
    BufferPoolBelowMinimum,
    HighConnectionCount,
    LargeSortBuffer,
}

impl Warning {
    pub fn message(self) -> &'static str {
        match self {
            Warning::ServerMemoryExceeded => "Total memory usage exceeds 80% of server RAM.",
            Warning::BufferPoolBelowMinimum => {
                "innodb_buffer_pool_size is below the recommended 128MB minimum."
            }
            Warning::HighConnectionCount => {
                "High max_connections value may lead to excessive memory usage."
            }
            Warning::LargeSortBuffer => {
                "Large sort_buffer_size may impact performance with many connections."
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Runs the advisory rules in their fixed order. `server_memory_bytes` of
/// `None` or `<= 0` disables the server RAM rule.
pub fn evaluate_warnings(
    config: &ConfigurationSet,
    totals: &MemoryTotals,
    server_memory_bytes: Option<f64>,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if let Some(server) = server_memory_bytes.filter(|s| *s > 0.0) {
        if totals.total as f64 > server * SERVER_MEMORY_RATIO {
            warnings.push(Warning::ServerMemoryExceeded);
        }
    }
    if config.innodb_buffer_pool_size < MIN_BUFFER_POOL_BYTES {
        warnings.push(Warning::BufferPoolBelowMinimum);
    }
    if config.max_connections > MAX_CONNECTIONS_ADVISORY {
        warnings.push(Warning::HighConnectionCount);
    }
    if config.sort_buffer_size > MAX_SORT_BUFFER_BYTES {
        warnings.push(Warning::LargeSortBuffer);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::ALL_VARIABLES;

    fn zeroed() -> ConfigurationSet {
        let mut cfg = ConfigurationSet::default();
        for v in ALL_VARIABLES {
            cfg.set(v, 0);
        }
        cfg
    }

    #[test]
    fn defaults_add_up() {
        let totals = compute_totals(&ConfigurationSet::default());
        assert_eq!(totals.global_buffers, 167_772_160);
        assert_eq!(totals.per_connection_buffers, 17_956_864);
        assert_eq!(totals.total_per_connection, 2_711_486_464);
        assert_eq!(totals.total, 2_879_258_624);
    }

    #[test]
    fn total_is_global_plus_scaled_connections() {
        let mut cfg = zeroed();
        cfg.innodb_buffer_pool_size = 1000;
        cfg.key_buffer_size = 24;
        cfg.sort_buffer_size = 7;
        cfg.tmp_table_size = 3;
        cfg.max_connections = 9;
        let t = compute_totals(&cfg);
        assert_eq!(t.global_buffers, 1024);
        assert_eq!(t.per_connection_buffers, 10);
        assert_eq!(t.total_per_connection, 90);
        assert_eq!(t.total, 1114);
    }

    #[test]
    fn zero_connections_leaves_only_global() {
        let mut cfg = ConfigurationSet::default();
        cfg.max_connections = 0;
        let t = compute_totals(&cfg);
        assert_eq!(t.total_per_connection, 0);
        assert_eq!(t.total, t.global_buffers);
    }

    #[test]
    fn monotone_in_every_input() {
        let base = ConfigurationSet::default();
        let base_total = compute_totals(&base).total;
        for v in ALL_VARIABLES {
            for bump in [1u64, 1024, 1 << 30] {
                let mut cfg = base;
                cfg.set(v, base.get(v) + bump);
                assert!(compute_totals(&cfg).total >= base_total, "{v} +{bump}");
            }
        }
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let mut cfg = ConfigurationSet::default();
        cfg.thread_stack = u64::MAX;
        cfg.max_connections = u64::MAX;
        let t = compute_totals(&cfg);
        assert_eq!(t.per_connection_buffers, u64::MAX);
        assert_eq!(t.total, u64::MAX);
    }

    #[test]
    fn defaults_raise_no_warnings_without_server_memory() {
        let cfg = ConfigurationSet::default();
        let t = compute_totals(&cfg);
        assert!(evaluate_warnings(&cfg, &t, None).is_empty());
    }

    #[test]
    fn server_memory_rule_boundary() {
        let cfg = ConfigurationSet::default();
        let mut t = compute_totals(&cfg);
        t.total = 800;
        assert!(evaluate_warnings(&cfg, &t, Some(1000.0)).is_empty());
        t.total = 801;
        assert_eq!(evaluate_warnings(&cfg, &t, Some(1000.0)), vec![Warning::ServerMemoryExceeded]);
        assert!(evaluate_warnings(&cfg, &t, Some(0.0)).is_empty());
        assert!(evaluate_warnings(&cfg, &t, Some(-10.0)).is_empty());
    }

    #[test]
    fn buffer_pool_rule_boundary() {
        let mut cfg = ConfigurationSet::default();
        cfg.innodb_buffer_pool_size = MIN_BUFFER_POOL_BYTES;
        let t = compute_totals(&cfg);
        assert!(evaluate_warnings(&cfg, &t, None).is_empty());
        cfg.innodb_buffer_pool_size = MIN_BUFFER_POOL_BYTES - 1;
        let t = compute_totals(&cfg);
        assert_eq!(evaluate_warnings(&cfg, &t, None), vec![Warning::BufferPoolBelowMinimum]);
    }

    #[test]
    fn connection_and_sort_rules() {
        let mut cfg = ConfigurationSet::default();
        cfg.max_connections = 1000;
        cfg.sort_buffer_size = MAX_SORT_BUFFER_BYTES;
        let t = compute_totals(&cfg);
        assert!(evaluate_warnings(&cfg, &t, None).is_empty());

        cfg.max_connections = 1001;
        cfg.sort_buffer_size = MAX_SORT_BUFFER_BYTES + 1;
        let t = compute_totals(&cfg);
        assert_eq!(
            evaluate_warnings(&cfg, &t, None),
            vec![Warning::HighConnectionCount, Warning::LargeSortBuffer]
        );
    }

    #[test]
    fn all_rules_fire_in_order() {
        let mut cfg = ConfigurationSet::default();
        cfg.set(Variable::InnodbBufferPoolSize, 0);
        cfg.set(Variable::MaxConnections, 5000);
        cfg.set(Variable::SortBufferSize, 1 << 20);
        let t = compute_totals(&cfg);
        let got = evaluate_warnings(&cfg, &t, Some(1024.0));
        assert_eq!(
            got,
            vec![
                Warning::ServerMemoryExceeded,
                Warning::BufferPoolBelowMinimum,
                Warning::HighConnectionCount,
                Warning::LargeSortBuffer,
            ]
        );
        assert_eq!(got[0].to_string(), "Total memory usage exceeds 80% of server RAM.");
    }

    #[test]
    fn usage_percent_and_distribution() {
        let t = MemoryTotals { global_buffers: 25, per_connection_buffers: 5, total_per_connection: 75, total: 100 };
        assert_eq!(t.server_usage_percent(Some(400.0)), Some(25.0));
        assert_eq!(t.server_usage_percent(Some(0.0)), None);
        assert_eq!(t.server_usage_percent(None), None);
        let d = t.distribution();
        assert_eq!(d.global, 0.25);
        assert_eq!(d.per_connection, 0.75);
        assert_eq!(MemoryTotals::default().distribution(), Distribution::default());
    }
}
