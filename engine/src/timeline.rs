//! Busy-period tracking for the drum resource.

use chrono::{DateTime, Duration, Utc};

/// Sorted, non-overlapping, half-open `[start, end)` busy periods on one resource.
///
/// Locked operations seed the timeline; drum operations are packed into the
/// free space between them.
#[derive(Clone, Debug)]
pub struct DrumTimeline {
    /// Invariant: sorted by start, non-overlapping, non-touching
    pub busy_periods: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl DrumTimeline {
    /// Create a timeline with periods that are already taken.
    pub fn new(reserved: Vec<(DateTime<Utc>, DateTime<Utc>)>) -> Self {
        Self {
            busy_periods: Self::merge_periods(reserved),
        }
    }

    /// Drop empty periods and merge overlapping or touching ones.
    fn merge_periods(
        mut periods: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        periods.retain(|(start, end)| end > start);
        periods.sort_by_key(|(start, _)| *start);

        let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(periods.len());
        for (start, end) in periods {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end => {
                    *last_end = (*last_end).max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    /// Mark `[start, end)` busy, merging with neighbours.
    pub fn add_busy_period(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        if end <= start {
            return;
        }

        let idx = self.busy_periods.partition_point(|(s, _)| *s < start);
        let mut new_start = start;
        let mut new_end = end;
        let mut merge_start = idx;
        let mut merge_end = idx;

        if idx > 0 {
            let (prev_start, prev_end) = self.busy_periods[idx - 1];
            if prev_end >= start {
                new_start = prev_start;
                new_end = new_end.max(prev_end);
                merge_start = idx - 1;
            }
        }

        while merge_end < self.busy_periods.len() {
            let (next_start, next_end) = self.busy_periods[merge_end];
            if next_start <= new_end {
                new_end = new_end.max(next_end);
                merge_end += 1;
            } else {
                break;
            }
        }

        self.busy_periods.drain(merge_start..merge_end);
        self.busy_periods.insert(merge_start, (new_start, new_end));
    }

    /// First busy period that ends after `at`.
    fn next_busy_period(&self, at: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let idx = self.busy_periods.partition_point(|(_, end)| *end <= at);
        self.busy_periods.get(idx).copied()
    }

    /// Earliest start at or after `from` where `length` fits without touching a busy period.
    ///
    /// Returns `None` if the interval would end past the representable calendar.
    pub fn earliest_fit(&self, from: DateTime<Utc>, length: Duration) -> Option<DateTime<Utc>> {
        let mut candidate = from;
        loop {
            let end = candidate.checked_add_signed(length)?;
            match self.next_busy_period(candidate) {
                Some((busy_start, busy_end)) if busy_start < end => candidate = busy_end,
                _ => return Some(candidate),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn h(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_timeline_fits_immediately() {
        let timeline = DrumTimeline::new(vec![]);
        assert_eq!(timeline.earliest_fit(h(2), Duration::hours(5)), Some(h(2)));
    }

    #[test]
    fn test_new_merges_overlapping_and_touching() {
        let timeline = DrumTimeline::new(vec![
            (h(5), h(7)),
            (h(1), h(3)),
            (h(3), h(4)),
            (h(6), h(9)),
            (h(10), h(10)),
        ]);
        assert_eq!(timeline.busy_periods, vec![(h(1), h(4)), (h(5), h(9))]);
    }

    #[test]
    fn test_add_busy_period_merges_neighbours() {
        let mut timeline = DrumTimeline::new(vec![(h(1), h(2)), (h(4), h(5))]);
        timeline.add_busy_period(h(2), h(4));
        assert_eq!(timeline.busy_periods, vec![(h(1), h(5))]);
    }

    #[test]
    fn test_add_busy_period_separate() {
        let mut timeline = DrumTimeline::new(vec![(h(1), h(2))]);
        timeline.add_busy_period(h(6), h(8));
        timeline.add_busy_period(h(3), h(4));
        assert_eq!(
            timeline.busy_periods,
            vec![(h(1), h(2)), (h(3), h(4)), (h(6), h(8))]
        );
    }

    #[test]
    fn test_earliest_fit_skips_too_small_gap() {
        let timeline = DrumTimeline::new(vec![(h(2), h(3)), (h(4), h(6))]);
        // 0..2 fits two hours
        assert_eq!(timeline.earliest_fit(h(0), Duration::hours(2)), Some(h(0)));
        // 3..4 is too small for two hours, next free space starts at 6
        assert_eq!(timeline.earliest_fit(h(1), Duration::hours(2)), Some(h(6)));
        // inside a busy period
        assert_eq!(timeline.earliest_fit(h(5), Duration::hours(1)), Some(h(6)));
    }

    #[test]
    fn test_earliest_fit_past_calendar() {
        let timeline = DrumTimeline::new(vec![(h(4), h(6))]);
        assert_eq!(timeline.earliest_fit(DateTime::<Utc>::MAX_UTC, Duration::hours(1)), None);
    }
}
