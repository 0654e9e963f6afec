//! Tab-separated report bodies
//!
//! A ready report is plain TSV: an optional title line, an optional column header,
//! data rows and an optional `Total rows: N` summary, each shaped by the report
//! headers the request was sent with. The text is kept as received and every view
//! is derived from it, so access can be repeated.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::ReportOptions;
use crate::{Error, Result};

const SUMMARY_PREFIX: &str = "Total rows";

/// A downloaded report
#[derive(Debug, Clone)]
pub struct Report {
    text: String,
    title: Option<String>,
    summary: Option<String>,
    /// Column header (if any) followed by data rows
    lines: Vec<String>,
    has_column_header: bool,
    columns: OnceLock<Vec<String>>,
}

impl Report {
    /// Split `text` according to the layout the request asked for
    pub fn new(text: impl Into<String>, options: &ReportOptions) -> Self {
        let text = text.into();
        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        if lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        let title = if !options.skip_report_header && !lines.is_empty() {
            Some(lines.remove(0))
        } else {
            None
        };

        let summary = if !options.skip_report_summary
            && lines.last().map(|l| l.starts_with(SUMMARY_PREFIX)).unwrap_or(false)
        {
            lines.pop()
        } else {
            None
        };

        Self {
            text,
            title,
            summary,
            lines,
            has_column_header: !options.skip_column_header,
            columns: OnceLock::new(),
        }
    }

    /// Body exactly as received
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Report name and period line, when the title was not skipped
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `Total rows: N` line, when the summary was not skipped
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Row count announced by the summary line
    pub fn total_rows(&self) -> Option<usize> {
        self.summary
            .as_deref()?
            .rsplit(':')
            .next()?
            .trim()
            .parse()
            .ok()
    }

    /// Column header (if present) and data lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Column names from the header line
    ///
    /// Parsed on first access and fixed afterwards.
    pub fn columns(&self) -> Result<&[String]> {
        if !self.has_column_header {
            return Err(Error::Report {
                message: "report was requested without a column header".to_string(),
            });
        }
        let Some(header) = self.lines.first() else {
            return Err(Error::Report {
                message: "report is empty, no column header".to_string(),
            });
        };
        Ok(self
            .columns
            .get_or_init(|| header.split('\t').map(str::to_string).collect()))
    }

    fn data_lines(&self) -> &[String] {
        if self.has_column_header && !self.lines.is_empty() {
            &self.lines[1..]
        } else {
            &self.lines
        }
    }

    /// Data rows split into cells
    pub fn values(&self) -> Vec<Vec<&str>> {
        self.data_lines()
            .iter()
            .map(|line| line.split('\t').collect())
            .collect()
    }

    /// Column-major view: one vector per column
    pub fn to_columns(&self) -> Vec<Vec<&str>> {
        let rows = self.values();
        let width = match self.columns() {
            Ok(columns) => columns.len(),
            Err(_) => rows.iter().map(Vec::len).max().unwrap_or(0),
        };
        (0..width)
            .map(|col| {
                rows.iter()
                    .map(|row| row.get(col).copied().unwrap_or(""))
                    .collect()
            })
            .collect()
    }

    /// Rows keyed by column name
    pub fn to_dicts(&self) -> Result<Vec<BTreeMap<&str, &str>>> {
        let columns = self.columns()?;
        Ok(self
            .values()
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.into_iter().chain(std::iter::repeat("")))
                    .collect()
            })
            .collect())
    }

    pub fn row_count(&self) -> usize {
        self.data_lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_lines().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "col1\tcol2\nvalue1\tvalue2\nvalue10\tvalue20\n";

    fn default_report(text: &str) -> Report {
        Report::new(text, &ReportOptions::default())
    }

    #[test]
    fn test_columns_and_rows() {
        let report = default_report(BODY);
        assert_eq!(report.columns().unwrap(), ["col1", "col2"]);
        assert_eq!(report.values(), vec![vec!["value1", "value2"], vec!["value10", "value20"]]);
        assert_eq!(report.lines().len(), 3);
        assert_eq!(report.row_count(), 2);
    }

    #[test]
    fn test_column_major() {
        let report = default_report(BODY);
        assert_eq!(
            report.to_columns(),
            vec![vec!["value1", "value10"], vec!["value2", "value20"]]
        );
    }

    #[test]
    fn test_dicts() {
        let report = default_report(BODY);
        let dicts = report.to_dicts().unwrap();
        assert_eq!(dicts.len(), 2);
        assert_eq!(dicts[0]["col1"], "value1");
        assert_eq!(dicts[1]["col2"], "value20");
    }

    #[test]
    fn test_repeated_access_is_stable() {
        let report = default_report(BODY);
        let first = report.to_dicts().unwrap();
        let second = report.to_dicts().unwrap();
        assert_eq!(first, second);
        assert_eq!(report.columns().unwrap(), report.columns().unwrap());
        assert_eq!(report.text(), BODY);
    }

    #[test]
    fn test_title_and_summary_split_off() {
        let options = ReportOptions {
            skip_report_header: false,
            skip_report_summary: false,
            ..Default::default()
        };
        let text = "\"Campaign stats (2024-01-01 - 2024-01-31)\"\nDate\tClicks\n2024-01-01\t5\nTotal rows: 1\n";
        let report = Report::new(text, &options);

        assert_eq!(report.title(), Some("\"Campaign stats (2024-01-01 - 2024-01-31)\""));
        assert_eq!(report.summary(), Some("Total rows: 1"));
        assert_eq!(report.total_rows(), Some(1));
        assert_eq!(report.columns().unwrap(), ["Date", "Clicks"]);
        assert_eq!(report.values(), vec![vec!["2024-01-01", "5"]]);
    }

    #[test]
    fn test_no_column_header() {
        let options = ReportOptions {
            skip_column_header: true,
            ..Default::default()
        };
        let report = Report::new("a\tb\nc\td\n", &options);
        assert!(report.columns().is_err());
        assert!(report.to_dicts().is_err());
        assert_eq!(report.values().len(), 2);
        assert_eq!(report.to_columns(), vec![vec!["a", "c"], vec!["b", "d"]]);
    }

    #[test]
    fn test_empty_report() {
        let report = default_report("");
        assert!(report.is_empty());
        assert!(report.columns().is_err());
        assert!(report.to_columns().is_empty());
    }
}
