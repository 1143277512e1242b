use crate::model::*;

// ── Lane assignment ───────────────────────────────────────────────

/// Assign each interval a lane so overlapping intervals render side by side.
///
/// Output is index-aligned with `intervals`. Internally:
/// 1. Stable sort by start (ties keep input order).
/// 2. Sweep into overlap groups: an interval joins the open group iff it
///    starts strictly before the group's furthest end, i.e. it overlaps
///    at least one member. Groups are therefore the transitive closure of
///    pairwise overlap, and never nest.
/// 3. Greedy lowest-free-lane within each group, in start order.
/// 4. `total_columns` is the group size, so lane widths stay stable across
///    the whole cluster.
pub fn partition(intervals: &[TimeInterval]) -> Vec<LayoutColumnInfo> {
    let mut result = vec![
        LayoutColumnInfo {
            column: 0,
            total_columns: 1,
        };
        intervals.len()
    ];
    if intervals.len() < 2 {
        return result;
    }

    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by_key(|&i| intervals[i].start);

    for group in overlap_groups(intervals, &order) {
        let total_columns = group.len();
        for (idx, column) in assign_lanes(intervals, &group) {
            result[idx] = LayoutColumnInfo {
                column,
                total_columns,
            };
        }
    }

    result
}

/// Split `order` (indices sorted by start) into maximal connected overlap groups.
pub fn overlap_groups(intervals: &[TimeInterval], order: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_end = None;

    for &idx in order {
        let span = intervals[idx].span();
        match (groups.last_mut(), group_end) {
            (Some(group), Some(end)) if span.start < end => {
                group.push(idx);
                if span.end > end {
                    group_end = Some(span.end);
                }
            }
            _ => {
                groups.push(vec![idx]);
                group_end = Some(span.end);
            }
        }
    }

    groups
}

/// Greedy interval-graph colouring of one group (members in start order).
///
/// A lane is reusable only once its occupant has ended strictly before the
/// next member starts; a member starting exactly at another's end inside the
/// same cluster takes a fresh lane.
fn assign_lanes(intervals: &[TimeInterval], group: &[usize]) -> Vec<(usize, usize)> {
    let mut lane_ends: Vec<Timestamp> = Vec::new();
    let mut assigned = Vec::with_capacity(group.len());

    for &idx in group {
        let span = intervals[idx].span();
        let column = match lane_ends.iter().position(|&end| end < span.start) {
            Some(free) => {
                lane_ends[free] = span.end;
                free
            }
            None => {
                lane_ends.push(span.end);
                lane_ends.len() - 1
            }
        };
        assigned.push((idx, column));
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn iv(h: u32, m: u32, minutes: u32) -> TimeInterval {
        TimeInterval::new(at(h, m), minutes)
    }

    fn info(column: usize, total_columns: usize) -> LayoutColumnInfo {
        LayoutColumnInfo {
            column,
            total_columns,
        }
    }

    #[test]
    fn empty_and_single() {
        assert!(partition(&[]).is_empty());
        assert_eq!(partition(&[iv(9, 0, 60)]), vec![info(0, 1)]);
    }

    #[test]
    fn touching_intervals_share_lane_zero() {
        let result = partition(&[iv(9, 0, 60), iv(10, 0, 60)]);
        assert_eq!(result, vec![info(0, 1), info(0, 1)]);
    }

    #[test]
    fn chained_group_gets_three_lanes() {
        // A 09:00-10:00, B 09:30-10:30, C 10:00-11:00, D 12:00-13:00
        let result = partition(&[iv(9, 0, 60), iv(9, 30, 60), iv(10, 0, 60), iv(12, 0, 60)]);
        assert_eq!(result[0], info(0, 3));
        assert_eq!(result[1], info(1, 3));
        assert_eq!(result[2], info(2, 3));
        assert_eq!(result[3], info(0, 1));
    }

    #[test]
    fn lane_reused_after_gap_inside_group() {
        // long 09:00-12:00 keeps the group open; short ones leave gaps between them
        let result = partition(&[iv(9, 0, 180), iv(9, 0, 30), iv(10, 0, 30)]);
        assert_eq!(result[0], info(0, 3));
        assert_eq!(result[1], info(1, 3));
        assert_eq!(result[2], info(1, 3));
    }

    #[test]
    fn duplicates_get_distinct_lanes() {
        let result = partition(&[iv(9, 0, 30), iv(9, 0, 30)]);
        assert_eq!(result, vec![info(0, 2), info(1, 2)]);
    }

    #[test]
    fn output_is_index_aligned_with_unsorted_input() {
        let result = partition(&[iv(14, 0, 30), iv(9, 0, 60), iv(9, 30, 60)]);
        assert_eq!(result[0], info(0, 1));
        assert_eq!(result[1], info(0, 2));
        assert_eq!(result[2], info(1, 2));
    }

    #[test]
    fn equal_starts_break_ties_by_input_order() {
        let result = partition(&[iv(9, 0, 90), iv(9, 0, 30), iv(9, 0, 60)]);
        assert_eq!(result[0].column, 0);
        assert_eq!(result[1].column, 1);
        assert_eq!(result[2].column, 2);
    }

    #[test]
    fn groups_do_not_nest() {
        let intervals = [iv(9, 0, 60), iv(9, 30, 60), iv(13, 0, 30), iv(13, 15, 30)];
        let mut order: Vec<usize> = (0..intervals.len()).collect();
        order.sort_by_key(|&i| intervals[i].start);
        let groups = overlap_groups(&intervals, &order);
        assert_eq!(groups, vec![vec![0, 1], vec![2, 3]]);
    }

    fn arb_interval() -> impl Strategy<Value = TimeInterval> {
        (0u32..24 * 4, 1u32..=16).prop_map(|(slot, len)| {
            TimeInterval::new(at(0, 0) + Duration::minutes(slot as i64 * 15), len * 15)
        })
    }

    proptest! {
        #[test]
        fn prop_no_overlap_within_lane(intervals in prop::collection::vec(arb_interval(), 0..40)) {
            let result = partition(&intervals);
            for i in 0..intervals.len() {
                for j in (i + 1)..intervals.len() {
                    if result[i].column == result[j].column && intervals[i].overlaps(&intervals[j]) {
                        prop_assert!(false, "lane collision between {} and {}", i, j);
                    }
                }
            }
        }

        #[test]
        fn prop_columns_fit_total(intervals in prop::collection::vec(arb_interval(), 0..40)) {
            for info in partition(&intervals) {
                prop_assert!(info.total_columns >= 1);
                prop_assert!(info.column < info.total_columns);
            }
        }

        #[test]
        fn prop_clique_uses_k_lanes(k in 1usize..12, len in 60u32..240) {
            // all start within the first minute-steps so every pair overlaps
            let intervals: Vec<_> = (0..k)
                .map(|i| TimeInterval::new(at(9, 0) + Duration::minutes(i as i64), len))
                .collect();
            let result = partition(&intervals);
            let mut columns: Vec<usize> = result.iter().map(|r| r.column).collect();
            columns.sort_unstable();
            prop_assert_eq!(columns, (0..k).collect::<Vec<_>>());
            prop_assert!(result.iter().all(|r| r.total_columns == k));
        }

        #[test]
        fn prop_shuffle_keeps_groups_and_lanes(
            (intervals, perm) in prop::collection::vec(arb_interval(), 1..20).prop_flat_map(|v| {
                let indices: Vec<usize> = (0..v.len()).collect();
                (Just(v), Just(indices).prop_shuffle())
            }),
        ) {
            // shuffled[k] is intervals[perm[k]]
            let shuffled: Vec<TimeInterval> = perm.iter().map(|&i| intervals[i]).collect();
            let original = partition(&intervals);
            let result = partition(&shuffled);

            for (k, &i) in perm.iter().enumerate() {
                prop_assert_eq!(result[k].total_columns, original[i].total_columns);
            }
            for a in 0..shuffled.len() {
                for b in (a + 1)..shuffled.len() {
                    if result[a].column == result[b].column {
                        prop_assert!(
                            !shuffled[a].overlaps(&shuffled[b]),
                            "lane collision between {} and {} after shuffle", a, b
                        );
                    }
                }
            }
        }
    }
}
