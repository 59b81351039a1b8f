use serde::Serialize;
use std::fmt::Write as _;

use crate::calculator::{Distribution, MemoryTotals, Warning};
use crate::session::{ServerMemory, Session};
use crate::units::{format_bytes, DisplayUnit};
use crate::variables::{Group, Variable, ALL_VARIABLES};

#[derive(Debug, Clone, Serialize)]
pub struct VariableRow {
    pub name: Variable,
    pub group: Group,
    pub bytes: u64,
    pub value: f64,
    /// `None` for `max_connections`.
    pub unit: Option<DisplayUnit>,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormattedTotals {
    pub global_buffers: String,
    pub per_connection_buffers: String,
    pub total_per_connection: String,
    pub total: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarningEntry {
    pub code: Warning,
    pub message: &'static str,
}

/// Snapshot of everything the calculator shows for one session.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub variables: Vec<VariableRow>,
    pub totals: MemoryTotals,
    pub formatted: FormattedTotals,
    pub server_memory: Option<ServerMemory>,
    pub server_memory_bytes: Option<f64>,
    pub server_usage_percent: Option<f64>,
    pub distribution: Distribution,
    pub warnings: Vec<WarningEntry>,
}

impl Report {
    pub fn from_session(session: &Session) -> Self {
        let totals = session.totals();
        let variables = ALL_VARIABLES
            .iter()
            .map(|&v| {
                let bytes = session.get(v);
                VariableRow {
                    name: v,
                    group: v.group(),
                    bytes,
                    value: session.display_value(v),
                    unit: (!v.is_count()).then(|| session.unit(v)),
                    formatted: if v.is_count() { bytes.to_string() } else { format_bytes(bytes as f64) },
                }
            })
            .collect();
        let server_memory_bytes = session.server_memory_bytes();
        Self {
            variables,
            totals,
            formatted: FormattedTotals {
                global_buffers: format_bytes(totals.global_buffers as f64),
                per_connection_buffers: format_bytes(totals.per_connection_buffers as f64),
                total_per_connection: format_bytes(totals.total_per_connection as f64),
                total: format_bytes(totals.total as f64),
            },
            server_memory: session.server_memory(),
            server_memory_bytes,
            server_usage_percent: totals.server_usage_percent(server_memory_bytes),
            distribution: totals.distribution(),
            warnings: session.warnings().into_iter().map(|w| WarningEntry { code: w, message: w.message() }).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let sections = [
            ("Global Buffers", Group::Global),
            ("Connections", Group::Connections),
            ("Per-Connection Buffers", Group::PerConnection),
        ];
        for (title, group) in sections {
            let _ = writeln!(out, "{title}");
            for row in self.variables.iter().filter(|r| r.group == group) {
                match row.unit {
                    Some(unit) => {
                        let _ = writeln!(out, "  {:<24} {:>12} {:<2}  ({})", row.name.name(), row.value, unit, row.formatted);
                    }
                    None => {
                        let _ = writeln!(out, "  {:<24} {:>12}", row.name.name(), row.value);
                    }
                }
            }
            out.push('\n');
        }

        let connections =
            self.variables.iter().find(|r| r.name == Variable::MaxConnections).map(|r| r.bytes).unwrap_or(0);
        let _ = writeln!(out, "Memory Usage Summary");
        let _ = writeln!(out, "  Global buffers                 {}", self.formatted.global_buffers);
        let _ = writeln!(out, "  Per connection                 {}", self.formatted.per_connection_buffers);
        let _ = writeln!(
            out,
            "  Per-connection total ({} conn) {}",
            connections,
            self.formatted.total_per_connection
        );
        let _ = writeln!(out, "  Total memory usage             {}", self.formatted.total);
        if let (Some(bytes), Some(pct)) = (self.server_memory_bytes, self.server_usage_percent) {
            let _ = writeln!(out, "  Server memory                  {} ({:.1}% used)", format_bytes(bytes), pct);
        }
        let _ = writeln!(
            out,
            "  Distribution                   global {:.1}% / per-connection {:.1}%",
            self.distribution.global * 100.0,
            self.distribution.per_connection * 100.0
        );
        out.push('\n');

        if self.warnings.is_empty() {
            let _ = writeln!(out, "No configuration warnings.");
        } else {
            let _ = writeln!(out, "Configuration Warnings");
            for w in &self.warnings {
                let _ = writeln!(out, "  ! {}", w.message);
            }
        }
        out
    }
}
