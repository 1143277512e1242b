use crate::config::LayoutConfig;
use crate::model::*;

use super::coords::{map_to_offset, visible_height};
use super::partition::partition;

/// Live items of `date`: non-cancelled appointments first, then blocks,
/// each in input order. Items starting on another day are dropped.
pub fn day_items(date: DayKey, appointments: &[Appointment], blocks: &[ScheduleBlock]) -> Vec<LayoutItem> {
    let appts = appointments
        .iter()
        .filter(|a| !a.status.is_cancelled() && a.interval.day() == date)
        .map(LayoutItem::from);
    let blocks = blocks
        .iter()
        .filter(|b| b.interval.day() == date)
        .map(LayoutItem::from);
    appts.chain(blocks).collect()
}

/// Renderable placement for every live item of `date`. Appointments and
/// blocks share one lane space, so a block can push an appointment aside.
/// Output is index-aligned with [`day_items`].
pub fn build_day_layout(
    date: DayKey,
    appointments: &[Appointment],
    blocks: &[ScheduleBlock],
    config: &LayoutConfig,
) -> Vec<LayoutDescriptor> {
    layout_items(&day_items(date, appointments, blocks), config)
}

pub fn layout_items(items: &[LayoutItem], config: &LayoutConfig) -> Vec<LayoutDescriptor> {
    let intervals: Vec<TimeInterval> = items.iter().map(|i| i.interval).collect();
    let columns = partition(&intervals);

    items
        .iter()
        .zip(columns)
        .map(|(item, col)| {
            let lane_width = config.available_width / col.total_columns as f64;
            LayoutDescriptor {
                item_id: item.id,
                kind: item.kind,
                column: col.column,
                total_columns: col.total_columns,
                top_offset: map_to_offset(item.interval.start.time(), &config.window, config.unit_per_hour),
                height: visible_height(item.interval.duration_minutes, config.unit_per_hour, config.min_height),
                left_offset: config.lane_origin_x + col.column as f64 * lane_width,
                width: (lane_width - config.gutter).max(0.0),
            }
        })
        .collect()
}
