use chrono::{NaiveTime, Timelike};

use crate::model::DayWindow;

/// Offset of `time` below the top of the window, linear in elapsed minutes
/// since `window.start_hour:00`. Times outside the window map outside
/// `[0, window height]`; clipping is the caller's business.
pub fn map_to_offset(time: NaiveTime, window: &DayWindow, unit_per_hour: f64) -> f64 {
    let minutes = time.hour() as f64 * 60.0 + time.minute() as f64 + time.second() as f64 / 60.0;
    let elapsed = minutes - window.start_hour as f64 * 60.0;
    elapsed / 60.0 * unit_per_hour
}

pub fn map_duration_to_height(duration_minutes: u32, unit_per_hour: f64) -> f64 {
    duration_minutes as f64 / 60.0 * unit_per_hour
}

/// Height with a visibility floor so short items stay tappable.
pub fn visible_height(duration_minutes: u32, unit_per_hour: f64, min_height: f64) -> f64 {
    map_duration_to_height(duration_minutes, unit_per_hour).max(min_height)
}

/// Total height of the rendered window.
pub fn window_height(window: &DayWindow, unit_per_hour: f64) -> f64 {
    window.hours() as f64 * unit_per_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_start_maps_to_zero() {
        let w = DayWindow::new(7, 22).unwrap();
        assert_eq!(map_to_offset(t(7, 0), &w, 60.0), 0.0);
        assert_eq!(map_to_offset(t(8, 30), &w, 60.0), 90.0);
        assert_eq!(map_to_offset(t(8, 30), &w, 120.0), 180.0);
    }

    #[test]
    fn out_of_window_is_not_clipped() {
        let w = DayWindow::new(7, 22).unwrap();
        assert_eq!(map_to_offset(t(6, 0), &w, 60.0), -60.0);
        assert!(map_to_offset(t(23, 0), &w, 60.0) > window_height(&w, 60.0));
    }

    #[test]
    fn duration_height() {
        assert_eq!(map_duration_to_height(90, 60.0), 90.0);
        assert_eq!(map_duration_to_height(30, 100.0), 50.0);
    }

    #[test]
    fn visible_height_applies_floor() {
        assert_eq!(visible_height(5, 60.0, 20.0), 20.0);
        assert_eq!(visible_height(45, 60.0, 20.0), 45.0);
    }

    proptest! {
        #[test]
        fn prop_offset_is_monotonic(a in 0u32..1440, b in 0u32..1440, unit in 1.0..500.0f64) {
            prop_assume!(a < b);
            let w = DayWindow::new(0, 24).unwrap();
            let t1 = t(a / 60, a % 60);
            let t2 = t(b / 60, b % 60);
            prop_assert!(map_to_offset(t1, &w, unit) < map_to_offset(t2, &w, unit));
        }
    }
}
