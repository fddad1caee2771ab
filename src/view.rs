//! Filter and pagination projection over the synchronized log collection

use crate::models::TaggedLog;

pub const CSV_HEADER: &str = "id,service,status_code,response_time_ms,is_success,created_at,message";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFilter {
    #[default]
    All,
    Errors,
    Success,
}

impl LogFilter {
    /// Cyclic rotation: all → errors → success → all.
    pub fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Errors,
            LogFilter::Errors => LogFilter::Success,
            LogFilter::Success => LogFilter::All,
        }
    }

    pub fn matches(&self, log: &TaggedLog) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Errors => log.entry.is_error(),
            LogFilter::Success => !log.entry.is_error(),
        }
    }
}

/// Pagination and filter state over the published log collection.
///
/// Holds no log data itself; every projection is recomputed against the
/// collection passed in, so a fresh snapshot never leaves the view stale.
#[derive(Clone, Debug)]
pub struct LogView {
    filter: LogFilter,
    page: usize,
    page_size: usize,
}

impl LogView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: LogFilter::All,
            page: 1,
            page_size,
        }
    }

    pub fn filter(&self) -> LogFilter {
        self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Rotate to the next filter mode; resets to the first page.
    pub fn cycle_filter(&mut self) -> LogFilter {
        self.filter = self.filter.next();
        self.page = 1;
        self.filter
    }

    /// Called when the active project changes.
    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    pub fn filtered<'a>(&self, logs: &'a [TaggedLog]) -> Vec<&'a TaggedLog> {
        logs.iter().filter(|log| self.filter.matches(log)).collect()
    }

    pub fn total_pages(&self, filtered_count: usize) -> usize {
        filtered_count.div_ceil(self.page_size).max(1)
    }

    /// Clamp the requested page into `[1, total_pages]`.
    pub fn set_page(&mut self, page: usize, filtered_count: usize) {
        self.page = page.clamp(1, self.total_pages(filtered_count));
    }

    pub fn next_page(&mut self, filtered_count: usize) {
        self.set_page(self.page + 1, filtered_count);
    }

    pub fn prev_page(&mut self, filtered_count: usize) {
        self.set_page(self.page.saturating_sub(1), filtered_count);
    }

    /// The rows of the current page. The page index is re-clamped here so
    /// a collection that shrank since the last interaction still yields a
    /// valid window.
    pub fn visible<'a>(&self, logs: &'a [TaggedLog]) -> Vec<&'a TaggedLog> {
        let filtered = self.filtered(logs);
        let page = self.page.clamp(1, self.total_pages(filtered.len()));
        filtered
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// CSV export of the currently filtered logs.
    pub fn export_csv(&self, logs: &[TaggedLog]) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');

        for log in self.filtered(logs) {
            let latency = log
                .entry
                .measured_latency()
                .map(|ms| ms.to_string())
                .unwrap_or_default();
            let message = log
                .entry
                .message
                .as_deref()
                .unwrap_or_default()
                .replace(',', " ");

            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                log.entry.id,
                log.service_name,
                log.entry.status_code,
                latency,
                log.entry.is_success,
                log.entry.created_at.to_rfc3339(),
                message,
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogEntry;
    use chrono::{TimeZone, Utc};

    fn tagged(id: i64, status_code: u16, is_success: bool, message: Option<&str>) -> TaggedLog {
        TaggedLog {
            service_name: "Auth Gateway".to_string(),
            entry: LogEntry {
                id,
                service_id: 4,
                status_code,
                response_time_ms: Some(150),
                is_success,
                message: message.map(String::from),
                created_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
            },
        }
    }

    #[test]
    fn test_filter_rotation_is_a_three_cycle() {
        let start = LogFilter::All;
        assert_eq!(start.next(), LogFilter::Errors);
        assert_eq!(start.next().next(), LogFilter::Success);
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_error_and_success_filters_partition_the_logs() {
        let logs = vec![
            tagged(1, 200, true, None),
            tagged(2, 404, true, None),
            tagged(3, 503, false, None),
            tagged(4, 201, true, None),
        ];
        let mut view = LogView::new(8);

        assert_eq!(view.filtered(&logs).len(), 4);
        view.cycle_filter();
        let errors = view.filtered(&logs).len();
        view.cycle_filter();
        let successes = view.filtered(&logs).len();

        assert_eq!(errors, 2);
        assert_eq!(successes, 2);
        assert_eq!(errors + successes, logs.len());
    }

    #[test]
    fn test_cycle_filter_resets_page() {
        let logs: Vec<TaggedLog> = (0..20).map(|i| tagged(i, 200, true, None)).collect();
        let mut view = LogView::new(8);

        view.set_page(3, logs.len());
        assert_eq!(view.page(), 3);
        view.cycle_filter();
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_total_pages_and_clamping() {
        let mut view = LogView::new(8);

        assert_eq!(view.total_pages(0), 1);
        assert_eq!(view.total_pages(8), 1);
        assert_eq!(view.total_pages(9), 2);
        assert_eq!(view.total_pages(17), 3);

        view.set_page(99, 17);
        assert_eq!(view.page(), 3);
        view.set_page(0, 17);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_visible_window() {
        let logs: Vec<TaggedLog> = (0..20).map(|i| tagged(i, 200, true, None)).collect();
        let mut view = LogView::new(8);

        assert_eq!(view.visible(&logs).len(), 8);
        view.next_page(logs.len());
        assert_eq!(view.visible(&logs)[0].entry.id, 8);
        view.next_page(logs.len());
        assert_eq!(view.visible(&logs).len(), 4);
        // already at the last page
        view.next_page(logs.len());
        assert_eq!(view.page(), 3);
    }

    #[test]
    fn test_visible_reclamps_after_collection_shrinks() {
        let many: Vec<TaggedLog> = (0..20).map(|i| tagged(i, 200, true, None)).collect();
        let few: Vec<TaggedLog> = (0..3).map(|i| tagged(i, 200, true, None)).collect();
        let mut view = LogView::new(8);

        view.set_page(3, many.len());
        assert_eq!(view.visible(&few).len(), 3);
    }

    #[test]
    fn test_csv_export_replaces_commas_in_message() {
        let logs = vec![
            tagged(1, 502, false, Some("Bad gateway, upstream provider down")),
            tagged(2, 500, false, Some("Timeout on charge")),
        ];
        let mut view = LogView::new(8);
        view.cycle_filter(); // errors

        let csv = view.export_csv(&logs);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("Bad gateway  upstream provider down"));
        assert_eq!(lines[1].split(',').count(), 7);
    }

    #[test]
    fn test_csv_export_blank_fields_for_missing_values() {
        let mut log = tagged(1, 503, false, None);
        log.entry.response_time_ms = None;
        let view = LogView::new(8);

        let csv = view.export_csv(&[log]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "1,Auth Gateway,503,,false,2026-08-07T12:00:00+00:00,"
        );
    }
}
