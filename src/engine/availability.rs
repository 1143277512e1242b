use crate::model::*;

use super::hours::business_span;

// ── Open slots ────────────────────────────────────────────────────

/// Free spans of `day` inside business hours once every busy interval is
/// subtracted. Gaps shorter than `min_minutes` are dropped.
///
/// Callers pass only live items: cancelled appointments must already be
/// filtered out, schedule blocks included.
pub fn open_slots(
    day: DayKey,
    schedule: &WeeklySchedule,
    busy: &[TimeInterval],
    min_minutes: u32,
) -> Vec<Span> {
    let Some(open) = business_span(day, schedule) else {
        return Vec::new();
    };

    free_gaps(open, &busy_spans(busy))
        .into_iter()
        .filter(|s| s.duration_minutes() >= min_minutes as i64)
        .collect()
}

/// Coalesce bookings into disjoint busy spans, sorted by start. Back-to-back
/// bookings fuse into one span, since no slot fits between them.
pub fn busy_spans(busy: &[TimeInterval]) -> Vec<Span> {
    let mut sorted: Vec<TimeInterval> = busy.to_vec();
    sorted.sort_by_key(|iv| iv.start);

    let mut spans: Vec<Span> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        let end = iv.end();
        match spans.last_mut() {
            Some(last) if iv.start <= last.end => last.end = last.end.max(end),
            _ => spans.push(Span::new(iv.start, end)),
        }
    }
    spans
}

/// Parts of `open` not covered by `busy` (disjoint, sorted by start).
pub fn free_gaps(open: Span, busy: &[Span]) -> Vec<Span> {
    let mut gaps = Vec::new();
    let mut cursor = open.start;

    for taken in busy.iter().filter(|b| b.overlaps(&open)) {
        if taken.start > cursor {
            gaps.push(Span::new(cursor, taken.start));
        }
        cursor = cursor.max(taken.end);
    }

    if cursor < open.end {
        gaps.push(Span::new(cursor, open.end));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn mon() -> DayKey {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(h: u32, m: u32) -> Timestamp {
        mon().and_hms_opt(h, m, 0).unwrap()
    }

    fn sp(h1: u32, m1: u32, h2: u32, m2: u32) -> Span {
        Span::new(at(h1, m1), at(h2, m2))
    }

    fn schedule() -> WeeklySchedule {
        WeeklySchedule::uniform(
            &[1, 2, 3, 4, 5],
            hhmm::parse("09:00").unwrap(),
            hhmm::parse("17:00").unwrap(),
        )
        .unwrap()
    }

    fn iv(h: u32, m: u32, minutes: u32) -> TimeInterval {
        TimeInterval::new(at(h, m), minutes)
    }

    // ── free_gaps ────────────────────────────────────────

    #[test]
    fn booking_in_the_middle_splits_the_day() {
        let gaps = free_gaps(sp(9, 0, 12, 0), &[sp(10, 0, 10, 30)]);
        assert_eq!(gaps, vec![sp(9, 0, 10, 0), sp(10, 30, 12, 0)]);
    }

    #[test]
    fn booking_covering_the_day_leaves_nothing() {
        assert!(free_gaps(sp(9, 0, 10, 0), &[sp(8, 0, 11, 0)]).is_empty());
    }

    #[test]
    fn bookings_outside_hours_are_ignored() {
        let gaps = free_gaps(sp(9, 0, 10, 0), &[sp(7, 0, 8, 0), sp(10, 0, 11, 0)]);
        assert_eq!(gaps, vec![sp(9, 0, 10, 0)]);
    }

    // ── busy_spans ───────────────────────────────────────

    #[test]
    fn overlapping_and_back_to_back_bookings_fuse() {
        let spans = busy_spans(&[iv(13, 0, 60), iv(9, 30, 90), iv(9, 0, 60), iv(11, 0, 60)]);
        assert_eq!(spans, vec![sp(9, 0, 12, 0), sp(13, 0, 14, 0)]);
    }

    #[test]
    fn nested_booking_does_not_shrink_the_span() {
        let spans = busy_spans(&[iv(9, 0, 180), iv(10, 0, 15)]);
        assert_eq!(spans, vec![sp(9, 0, 12, 0)]);
    }

    // ── open_slots ────────────────────────────────────────

    #[test]
    fn empty_day_is_fully_open() {
        assert_eq!(open_slots(mon(), &schedule(), &[], 15), vec![sp(9, 0, 17, 0)]);
    }

    #[test]
    fn busy_items_are_carved_out() {
        let busy = [
            TimeInterval::new(at(12, 0), 60),
            TimeInterval::new(at(9, 30), 60),
            TimeInterval::new(at(10, 0), 30),
        ];
        let slots = open_slots(mon(), &schedule(), &busy, 15);
        assert_eq!(slots, vec![sp(9, 0, 9, 30), sp(10, 30, 12, 0), sp(13, 0, 17, 0)]);
    }

    #[test]
    fn short_gaps_are_dropped() {
        let busy = [TimeInterval::new(at(9, 0), 50), TimeInterval::new(at(10, 0), 420)];
        assert!(open_slots(mon(), &schedule(), &busy, 15).is_empty());
    }

    #[test]
    fn closed_day_has_no_slots() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        assert!(open_slots(sunday, &schedule(), &[], 15).is_empty());
    }
}
