use memcalc::calculator::{compute_totals, evaluate_warnings, Warning};
use memcalc::session::Session;
use memcalc::units::{format_bytes, from_bytes, to_bytes, DisplayUnit};
use memcalc::variables::{ConfigurationSet, Variable, ALL_VARIABLES};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_law() {
        for unit in DisplayUnit::ALL {
            for v in [0.0, 0.001, 1.0, 2.5, 17.0, 4096.0, 1e9] {
                let back = from_bytes(to_bytes(v, unit), unit);
                assert!((back - v).abs() <= 1e-9 * v.max(1.0), "{v} {unit} -> {back}");
            }
        }
    }

    #[test]
    fn test_format_examples() {
        assert_eq!(format_bytes(0.0), "0 B");
        assert_eq!(format_bytes(134_217_728.0), "128 MB");
        assert_eq!(format_bytes(1536.0), "1.5 KB");
        // past 1024^4 the label stays TB
        assert_eq!(format_bytes(1024f64.powi(5)), "1024 TB");
    }

    #[test]
    fn test_default_session_end_to_end() {
        let session = Session::default();
        let t = session.totals();
        assert_eq!(t.global_buffers, 167_772_160);
        assert_eq!(t.per_connection_buffers, 17_956_864);
        assert_eq!(t.total_per_connection, 2_711_486_464);
        assert_eq!(t.total, 2_879_258_624);
        assert!(session.warnings().is_empty());
        assert!(session.warnings_for(None, None).is_empty());
    }

    #[test]
    fn test_connections_to_zero() {
        let mut session = Session::default();
        session.set_input(Variable::MaxConnections, "0", DisplayUnit::Byte);
        let t = session.totals();
        assert_eq!(t.total_per_connection, 0);
        assert_eq!(t.total, t.global_buffers);
    }

    #[test]
    fn test_total_formula_exact() {
        let mut cfg = ConfigurationSet::default();
        for (i, v) in ALL_VARIABLES.iter().enumerate() {
            cfg.set(*v, (i as u64 + 1) * 1_000_003);
        }
        cfg.max_connections = 777;
        let t = compute_totals(&cfg);
        let g: u64 = [
            cfg.innodb_buffer_pool_size,
            cfg.innodb_log_buffer_size,
            cfg.key_buffer_size,
            cfg.query_cache_size,
        ]
        .iter()
        .sum();
        let p: u64 = [
            cfg.sort_buffer_size,
            cfg.read_buffer_size,
            cfg.read_rnd_buffer_size,
            cfg.join_buffer_size,
            cfg.thread_stack,
            cfg.tmp_table_size,
        ]
        .iter()
        .sum();
        assert_eq!(t.global_buffers, g);
        assert_eq!(t.per_connection_buffers, p);
        assert_eq!(t.total, g + p * 777);
    }

    #[test]
    fn test_monotone_under_session_edits() {
        let mut session = Session::default();
        let mut last = session.totals().total;
        for v in ALL_VARIABLES {
            let bumped = session.get(v) + 4096;
            session.set_bytes(v, bumped);
            let now = session.totals().total;
            assert!(now >= last, "{v}");
            last = now;
        }
    }

    #[test]
    fn test_server_ram_boundary_in_gigabytes() {
        let cfg = ConfigurationSet::default();
        let mut t = compute_totals(&cfg);
        let server = to_bytes(10.0, DisplayUnit::Gigabyte);
        t.total = to_bytes(8.0, DisplayUnit::Gigabyte) as u64;
        assert!(evaluate_warnings(&cfg, &t, Some(server)).is_empty());
        t.total += 1;
        assert_eq!(evaluate_warnings(&cfg, &t, Some(server)), vec![Warning::ServerMemoryExceeded]);
    }

    #[test]
    fn test_buffer_pool_boundary_via_input() {
        let mut session = Session::default();
        session.set_input(Variable::InnodbBufferPoolSize, "128", DisplayUnit::Megabyte);
        assert!(session.warnings().is_empty());
        session.set_input(Variable::InnodbBufferPoolSize, "127.99", DisplayUnit::Megabyte);
        assert_eq!(session.warnings(), vec![Warning::BufferPoolBelowMinimum]);
        session.set_input(Variable::InnodbBufferPoolSize, "not a number", DisplayUnit::Megabyte);
        assert_eq!(session.get(Variable::InnodbBufferPoolSize), 0);
        assert_eq!(session.warnings(), vec![Warning::BufferPoolBelowMinimum]);
    }

    #[test]
    fn test_busy_server_scenario() {
        let mut session = Session::default();
        session.set_input(Variable::MaxConnections, "2000", DisplayUnit::Byte);
        session.set_input(Variable::SortBufferSize, "2", DisplayUnit::Megabyte);
        session.set_server_memory("16", DisplayUnit::Gigabyte);
        assert_eq!(
            session.warnings(),
            vec![Warning::ServerMemoryExceeded, Warning::HighConnectionCount, Warning::LargeSortBuffer]
        );
        assert_eq!(session.format_bytes(session.totals().total as f64), "37.02 GB");
    }
}
