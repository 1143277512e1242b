use crate::model::*;

/// True iff `start` falls inside the opening hours of its weekday,
/// half-open: `open <= time < close`. Inactive weekdays are always outside.
pub fn is_within_hours(start: Timestamp, schedule: &WeeklySchedule) -> bool {
    let day = schedule.for_date(start.date());
    if !day.active {
        return false;
    }
    let time = start.time();
    day.open <= time && time < day.close
}

/// Opening hours of `date` as a span, or `None` on a closed day.
pub fn business_span(date: DayKey, schedule: &WeeklySchedule) -> Option<Span> {
    let day = schedule.for_date(date);
    if !day.active {
        return None;
    }
    Some(Span::new(date.and_time(day.open), date.and_time(day.close)))
}
