//! Human-readable byte sizes

const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];

/// Format `bytes` with two decimals in the largest unit below 1024
pub fn human_readable_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, UNITS[unit])
}
