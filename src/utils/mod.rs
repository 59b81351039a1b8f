use sysinfo::System;

/// Physical RAM of this machine in bytes, or `None` when it can't be read.
pub fn detect_total_memory() -> Option<u64> {
    let mut sys = System::new();
    sys.refresh_memory();
    Some(sys.total_memory()).filter(|b| *b > 0)
}

/// One-line host description for the startup log.
pub fn host_summary() -> String {
    let os = System::name().unwrap_or_else(|| "Unknown OS".into());
    let os_ver = System::os_version().unwrap_or_default();
    format!("{} {}", os, os_ver).trim().to_string()
}

pub fn format_ram_mb(ram_mb: u64) -> String {
    if ram_mb < 1024 { format!("{} MB", ram_mb) } else { format!("{:.1} GB", ram_mb as f64 / 1024.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_label_switches_to_gb() {
        assert_eq!(format_ram_mb(512), "512 MB");
        assert_eq!(format_ram_mb(1024), "1.0 GB");
        assert_eq!(format_ram_mb(16_384), "16.0 GB");
    }
}
