//! Progress bookkeeping shared with embedders.

use serde::Serialize;

/// Phase of a long-running operation, as reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationState {
    /// The operation is about to begin.
    Imminent,
    /// The operation is running.
    Underway,
    /// The operation has finished.
    Complete,
}

/// Percentage arithmetic for progress reporting.
///
/// Tracks file and byte counters and derives a clamped 0–100 percentage,
/// preferring the byte-based ratio when a byte total is known.
///
/// # Example
///
/// ```
/// use dupescan::progress::ProgressData;
///
/// let mut progress = ProgressData::new();
/// progress.update(10, 5, 0, 0);
/// assert_eq!(progress.percent, 50);
///
/// // Byte totals win over file counts when available.
/// progress.update(10, 5, 1000, 250);
/// assert_eq!(progress.percent, 25);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressData {
    /// Total number of files in the operation
    pub total_files: u64,
    /// Files processed so far
    pub files_processed: u64,
    /// Total number of bytes in the operation, if known
    pub total_data: u64,
    /// Bytes processed so far
    pub data_processed: u64,
    /// Completion percentage, clamped to 0–100
    pub percent: u8,
}

impl ProgressData {
    /// A zeroed record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record pre-populated with the given counters.
    #[must_use]
    pub fn with_counts(
        total_files: u64,
        files_processed: u64,
        total_data: u64,
        data_processed: u64,
    ) -> Self {
        let mut data = Self::default();
        data.update(total_files, files_processed, total_data, data_processed);
        data
    }

    /// Replace the counters and recompute the percentage.
    ///
    /// Returns `&mut self` so an update can feed straight into a callback.
    pub fn update(
        &mut self,
        total_files: u64,
        files_processed: u64,
        total_data: u64,
        data_processed: u64,
    ) -> &mut Self {
        self.total_files = total_files;
        self.files_processed = files_processed;
        self.total_data = total_data;
        self.data_processed = data_processed;

        let ratio = if total_data != 0 {
            data_processed as f64 / total_data as f64
        } else if total_files != 0 {
            files_processed as f64 / total_files as f64
        } else {
            0.0
        };

        self.percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let progress = ProgressData::new();
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.total_files, 0);
    }

    #[test]
    fn test_file_based_percent() {
        let progress = ProgressData::with_counts(4, 1, 0, 0);
        assert_eq!(progress.percent, 25);
    }

    #[test]
    fn test_data_based_percent_preferred() {
        let progress = ProgressData::with_counts(2, 1, 1000, 900);
        assert_eq!(progress.percent, 90);
    }

    #[test]
    fn test_percent_rounds() {
        let progress = ProgressData::with_counts(3, 1, 0, 0);
        // 33.33...% rounds to 33.
        assert_eq!(progress.percent, 33);

        let progress = ProgressData::with_counts(3, 2, 0, 0);
        // 66.66...% rounds to 67.
        assert_eq!(progress.percent, 67);
    }

    #[test]
    fn test_percent_clamped() {
        // More processed than total clamps at 100.
        let progress = ProgressData::with_counts(2, 5, 0, 0);
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_zero_totals_yield_zero() {
        let progress = ProgressData::with_counts(0, 0, 0, 0);
        assert_eq!(progress.percent, 0);
    }

    #[test]
    fn test_update_chains() {
        let mut progress = ProgressData::new();
        let percent = progress.update(10, 10, 0, 0).percent;
        assert_eq!(percent, 100);
    }
}
