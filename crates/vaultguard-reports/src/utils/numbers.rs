pub fn format_numbers(n: u64) -> String {
    match n {
        n if n > 1_000_000_000 => format!("{:0.1}B", n as f64 / 1_000_000_000.0),
        n if n > 1_000_000 => format!("{:0.1}M", n as f64 / 1_000_000.0),
        n if n > 1_000 => format!("{:0.1}K", n as f64 / 1_000.0),
        _ => n.to_string(),
    }
}

/// `part` as a percentage of `whole`, `N/A` when there is no whole.
pub fn format_share(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "N/A".to_string();
    }
    format!("{:.2}%", part as f64 / whole as f64 * 100.)
}
