//! Formatted output helpers for CLI commands.

use stackweave_compose::pipeline::CompositionReport;

/// Number of hex digits shown for artifact digests.
const SHORT_DIGEST_LEN: usize = 12;

/// Truncates a hex digest for display.
#[must_use]
pub fn short_digest(digest: &str) -> &str {
    digest.get(..SHORT_DIGEST_LEN).unwrap_or(digest)
}

/// Renders rows as left-aligned columns separated by two spaces.
///
/// Column widths come from the widest cell, header included. Trailing
/// whitespace is trimmed from every line.
#[must_use]
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            } else {
                widths.push(cell.len());
            }
        }
    }

    let mut out = String::new();
    let header_row: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for row in std::iter::once(&header_row).chain(rows) {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{cell:<width$}")
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// One-line summary of a composition.
#[must_use]
pub fn summary(report: &CompositionReport) -> String {
    format!(
        "{} unit(s), {} resource(s), {} route(s), {} divergence(s)",
        report.units.len(),
        report.resources.len(),
        report.routes.len(),
        report.divergences.len()
    )
}

/// Prints divergence warnings, one per line.
pub fn print_divergences(report: &CompositionReport) {
    for divergence in &report.divergences {
        println!(
            "  warning: {} overrides skeleton value at {}",
            divergence.unit, divergence.path
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_digest_truncates() {
        assert_eq!(short_digest("0123456789abcdef0123"), "0123456789ab");
    }

    #[test]
    fn short_digest_keeps_short_input() {
        assert_eq!(short_digest("abc"), "abc");
    }

    #[test]
    fn table_aligns_columns() {
        let table = format_table(
            &["METHOD", "PATH"],
            &[
                vec!["get".into(), "/a".into()],
                vec!["delete".into(), "/orders/{id}".into()],
            ],
        );
        assert_eq!(table, "METHOD  PATH\nget     /a\ndelete  /orders/{id}\n");
    }

    #[test]
    fn table_without_rows_prints_header() {
        assert_eq!(format_table(&["A", "B"], &[]), "A  B\n");
    }

    #[test]
    fn summary_counts_everything() {
        let report = CompositionReport {
            units: vec!["unit-a".into(), "unit-b".into()],
            resources: vec!["LambdaUnitA".into()],
            ..CompositionReport::default()
        };
        assert_eq!(
            summary(&report),
            "2 unit(s), 1 resource(s), 0 route(s), 0 divergence(s)"
        );
    }
}
