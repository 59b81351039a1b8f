use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::calculator::{compute_totals, evaluate_warnings, MemoryTotals, Warning};
use crate::units::{self, coerce_count, coerce_number, round_bytes, DisplayUnit};
use crate::variables::{ConfigurationSet, Variable, ALL_VARIABLES};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServerMemory {
    pub value: f64,
    pub unit: DisplayUnit,
}

impl ServerMemory {
    pub fn from_bytes(bytes: u64) -> Self {
        Self { value: bytes as f64, unit: DisplayUnit::Byte }
    }

    pub fn bytes(&self) -> f64 {
        units::to_bytes(self.value, self.unit)
    }
}

/// The single calculator session: current variables, the unit each one is
/// shown in, and the optional server RAM figure. All derived figures are
/// recomputed on every query.
#[derive(Debug, Clone)]
pub struct Session {
    config: ConfigurationSet,
    units: HashMap<Variable, DisplayUnit>,
    server_memory: Option<ServerMemory>,
    initial: ConfigurationSet,
    initial_server_memory: Option<ServerMemory>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ConfigurationSet::default(), None)
    }
}

impl Session {
    pub fn new(config: ConfigurationSet, server_memory: Option<ServerMemory>) -> Self {
        let units = ALL_VARIABLES.iter().map(|v| (*v, v.default_unit())).collect();
        Self { config, units, server_memory, initial: config, initial_server_memory: server_memory }
    }

    pub fn config(&self) -> &ConfigurationSet {
        &self.config
    }

    pub fn get(&self, variable: Variable) -> u64 {
        self.config.get(variable)
    }

    pub fn unit(&self, variable: Variable) -> DisplayUnit {
        if variable.is_count() {
            return DisplayUnit::Byte;
        }
        self.units.get(&variable).copied().unwrap_or_else(|| variable.default_unit())
    }

    pub fn display_value(&self, variable: Variable) -> f64 {
        let raw = self.get(variable) as f64;
        if variable.is_count() {
            return raw;
        }
        units::from_bytes(raw, self.unit(variable))
    }

    /// Stores raw form input typed in `unit`. Unparsable input stores 0.
    /// `max_connections` is read as a whole number and ignores `unit`.
    pub fn set_input(&mut self, variable: Variable, raw: &str, unit: DisplayUnit) {
        if variable.is_count() {
            self.config.set(variable, coerce_count(raw));
        } else {
            let bytes = round_bytes(units::to_bytes(coerce_number(raw), unit));
            self.units.insert(variable, unit);
            self.config.set(variable, bytes);
        }
        debug!(variable = %variable, raw, value = self.get(variable), "variable updated");
    }

    pub fn set_bytes(&mut self, variable: Variable, value: u64) {
        self.config.set(variable, value);
    }

    pub fn set_unit(&mut self, variable: Variable, unit: DisplayUnit) {
        if !variable.is_count() {
            self.units.insert(variable, unit);
        }
    }

    pub fn server_memory(&self) -> Option<ServerMemory> {
        self.server_memory
    }

    pub fn server_memory_bytes(&self) -> Option<f64> {
        self.server_memory.map(|m| m.bytes())
    }

    pub fn set_server_memory(&mut self, raw: &str, unit: DisplayUnit) {
        self.server_memory = Some(ServerMemory { value: coerce_number(raw), unit });
    }

    pub fn clear_server_memory(&mut self) {
        self.server_memory = None;
    }

    pub fn totals(&self) -> MemoryTotals {
        compute_totals(&self.config)
    }

    pub fn warnings(&self) -> Vec<Warning> {
        evaluate_warnings(&self.config, &self.totals(), self.server_memory_bytes())
    }

    /// Warnings against an explicit server RAM figure. A missing unit means bytes.
    pub fn warnings_for(&self, server_memory: Option<f64>, unit: Option<DisplayUnit>) -> Vec<Warning> {
        let bytes = server_memory.map(|v| units::to_bytes(v, unit.unwrap_or(DisplayUnit::Byte)));
        evaluate_warnings(&self.config, &self.totals(), bytes)
    }

    pub fn format_bytes(&self, bytes: f64) -> String {
        units::format_bytes(bytes)
    }

    pub fn reset(&mut self) {
        self.config = self.initial;
        self.server_memory = self.initial_server_memory;
        self.units = ALL_VARIABLES.iter().map(|v| (*v, v.default_unit())).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_converted_with_its_unit() {
        let mut s = Session::default();
        s.set_input(Variable::InnodbBufferPoolSize, "256", DisplayUnit::Megabyte);
        assert_eq!(s.get(Variable::InnodbBufferPoolSize), 256 * 1024 * 1024);
        assert_eq!(s.display_value(Variable::InnodbBufferPoolSize), 256.0);

        s.set_input(Variable::SortBufferSize, "1.5", DisplayUnit::Kilobyte);
        assert_eq!(s.get(Variable::SortBufferSize), 1536);
        assert_eq!(s.unit(Variable::SortBufferSize), DisplayUnit::Kilobyte);
    }

    #[test]
    fn invalid_input_becomes_zero() {
        let mut s = Session::default();
        for raw in ["abc", "", "-5"] {
            s.set_input(Variable::KeyBufferSize, raw, DisplayUnit::Megabyte);
            assert_eq!(s.get(Variable::KeyBufferSize), 0, "{raw:?}");
        }
        s.set_input(Variable::MaxConnections, "lots", DisplayUnit::Gigabyte);
        assert_eq!(s.get(Variable::MaxConnections), 0);
    }

    #[test]
    fn connection_count_is_integral_and_unitless() {
        let mut s = Session::default();
        s.set_input(Variable::MaxConnections, "300.9", DisplayUnit::Megabyte);
        assert_eq!(s.get(Variable::MaxConnections), 300);
        assert_eq!(s.display_value(Variable::MaxConnections), 300.0);
        s.set_unit(Variable::MaxConnections, DisplayUnit::Gigabyte);
        assert_eq!(s.unit(Variable::MaxConnections), DisplayUnit::Byte);
    }

    #[test]
    fn changing_unit_keeps_bytes() {
        let mut s = Session::default();
        let before = s.get(Variable::InnodbLogBufferSize);
        for unit in DisplayUnit::ALL {
            s.set_unit(Variable::InnodbLogBufferSize, unit);
            assert_eq!(s.get(Variable::InnodbLogBufferSize), before);
            let shown = s.display_value(Variable::InnodbLogBufferSize);
            assert_eq!(units::to_bytes(shown, unit), before as f64);
        }
    }

    #[test]
    fn server_memory_drives_the_ram_rule() {
        let mut s = Session::default();
        assert!(s.warnings().is_empty());
        s.set_server_memory("2", DisplayUnit::Gigabyte);
        assert_eq!(s.warnings(), vec![Warning::ServerMemoryExceeded]);
        s.set_server_memory("64", DisplayUnit::Gigabyte);
        assert!(s.warnings().is_empty());
        s.set_server_memory("garbage", DisplayUnit::Gigabyte);
        assert!(s.warnings().is_empty());
        s.clear_server_memory();
        assert_eq!(s.server_memory_bytes(), None);
    }

    #[test]
    fn warnings_for_explicit_figure() {
        let s = Session::default();
        assert_eq!(s.warnings_for(Some(1.0), Some(DisplayUnit::Gigabyte)), vec![Warning::ServerMemoryExceeded]);
        // bytes when no unit is given: 4 GiB is plenty for the defaults
        assert!(s.warnings_for(Some(4.0 * 1024f64.powi(3)), None).is_empty());
        assert!(s.warnings_for(None, Some(DisplayUnit::Gigabyte)).is_empty());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut s = Session::new(ConfigurationSet::default(), Some(ServerMemory::from_bytes(1 << 34)));
        s.set_bytes(Variable::MaxConnections, 5000);
        s.set_unit(Variable::ThreadStack, DisplayUnit::Byte);
        s.clear_server_memory();
        s.reset();
        assert_eq!(*s.config(), ConfigurationSet::default());
        assert_eq!(s.unit(Variable::ThreadStack), DisplayUnit::Kilobyte);
        assert_eq!(s.server_memory_bytes(), Some((1u64 << 34) as f64));
    }
}
