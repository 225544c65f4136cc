//! Progress indicators for long-running dataset loads
//!
//! Record counts are unknown up front (inputs are streamed), so loads use a
//! spinner that shows the running total.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const RECORD_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {prefix:>16} {human_pos} rows ({per_sec})";

/// Create a spinner counting rows written for one dataset
pub fn create_record_spinner(dataset: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(RECORD_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(dataset.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// A progress bar that draws nothing, for tests and non-interactive runs
pub fn hidden() -> ProgressBar {
    ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
}

/// Format a count with thousands separators, e.g. `1234567` as `1,234,567`
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(100_000), "100,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_record_spinner() {
        let pb = create_record_spinner("snp");
        assert_eq!(pb.prefix(), "snp");
        pb.inc(5);
        assert_eq!(pb.position(), 5);
        pb.finish_and_clear();
    }

    #[test]
    fn test_hidden_counts() {
        let pb = hidden();
        pb.inc(3);
        assert_eq!(pb.position(), 3);
    }
}
