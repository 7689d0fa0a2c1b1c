//! Plain-text ladder for the terminal viewer and the dump tool.
use std::fmt::Write;

use crate::book::{OrderLevel, Snapshot, bar_ratio};

/// `time (i+1 of N)`, or `No data` for an empty list.
pub fn position_line(timestamp: Option<&str>, index: usize, len: usize) -> String {
    match timestamp {
        Some(ts) => format!("{ts} ({} of {len})", index + 1),
        None => format!("No data ({} of {len})", if len == 0 { 0 } else { index + 1 }),
    }
}

fn bar(level: &OrderLevel, max: f64, width: usize) -> String {
    let filled = (bar_ratio(level.size, max) * width as f64).round() as usize;
    "#".repeat(filled.min(width))
}

/// Bids on the left, asks on the right, best level on the first row.
pub fn render_ladder(snapshot: Option<&Snapshot>, top: usize, bar_width: usize) -> String {
    let Some(book) = snapshot else {
        return "no data\n".to_string();
    };
    let max_bid = book.max_bid_size();
    let max_ask = book.max_ask_size();
    let rows = top.min(book.bids.len().max(book.asks.len()));

    let mut out = String::new();
    let _ = write!(out, "{}", book.time);
    if let Some(spread) = book.spread() {
        let _ = write!(out, "  spread={spread:.4}");
    }
    out.push('\n');
    for i in 0..rows {
        let b = book
            .bids
            .get(i)
            .map(|l| format!("{:>bar_width$} {:>10.2} x {:>9.2}", bar(l, max_bid, bar_width), l.price, l.size))
            .unwrap_or_else(|| format!("{:>w$}", "-", w = bar_width + 24));
        let a = book
            .asks
            .get(i)
            .map(|l| format!("{:>10.2} x {:>9.2} {:<bar_width$}", l.price, l.size, bar(l, max_ask, bar_width)))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{b} | {a}");
    }
    if rows == 0 {
        out.push_str("(empty book)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(price: f64, size: f64) -> OrderLevel {
        OrderLevel { price, size }
    }

    #[test]
    fn position_line_formats() {
        assert_eq!(position_line(Some("10:00:00"), 0, 3), "10:00:00 (1 of 3)");
        assert_eq!(position_line(None, 0, 0), "No data (0 of 0)");
    }

    #[test]
    fn zero_sizes_render_empty_bars() {
        let book = Snapshot {
            time: "t".into(),
            bids: vec![lvl(100.0, 0.0)],
            asks: vec![lvl(101.0, 0.0)],
        };
        let text = render_ladder(Some(&book), 5, 8);
        assert!(!text.contains('#'));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn largest_level_fills_the_bar() {
        let book = Snapshot {
            time: "t".into(),
            bids: vec![lvl(100.0, 4.0), lvl(99.0, 2.0)],
            asks: vec![lvl(101.0, 1.0)],
        };
        let text = render_ladder(Some(&book), 10, 8);
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("########"));
        assert!(rows[1].trim_start().starts_with("####"));
        assert!(rows[1].ends_with("| -"));
    }

    #[test]
    fn absent_and_empty_snapshots() {
        assert_eq!(render_ladder(None, 5, 8), "no data\n");
        let text = render_ladder(Some(&Snapshot::default()), 5, 8);
        assert!(text.contains("(empty book)"));
    }
}
