//! Property tests for table alignment and portfolio aggregation.
//!
//! Verifies:
//! 1. Union indices are strictly increasing and cover every input row
//! 2. Outer alignment keeps every cell of the left table
//! 3. Zero-filled differences are antisymmetric
//! 4. Forward-fill reindexing never drops rows of the target index

use chrono::{Duration, NaiveDate};
use folioscope_core::table::{align_outer, concat_columns, union_index};
use folioscope_core::{Fill, TimeSeriesTable};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Sorted, de-duplicated day offsets turned into dates.
fn arb_index() -> impl Strategy<Value = Vec<NaiveDate>> {
    prop::collection::btree_set(0i64..120, 1..30)
        .prop_map(|days| days.into_iter().map(|d| base() + Duration::days(d)).collect())
}

fn arb_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => (-5.0..5.0_f64).prop_map(|v| (v * 1000.0).round() / 1000.0),
        1 => Just(f64::NAN),
    ]
}

fn arb_table(names: &'static [&'static str]) -> impl Strategy<Value = TimeSeriesTable> {
    arb_index().prop_flat_map(move |index| {
        let n = index.len();
        prop::collection::vec(prop::collection::vec(arb_value(), n), names.len()).prop_map(
            move |columns| {
                let named = names
                    .iter()
                    .map(|s| s.to_string())
                    .zip(columns)
                    .collect();
                TimeSeriesTable::new(index.clone(), named).unwrap()
            },
        )
    })
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-9
}

// ── 1. Union index ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn union_index_is_sorted_superset(
        a in arb_table(&["x"]),
        b in arb_table(&["y"]),
    ) {
        let index = union_index(&[&a, &b]);
        prop_assert!(index.windows(2).all(|w| w[0] < w[1]));
        for d in a.index().iter().chain(b.index().iter()) {
            prop_assert!(index.binary_search(d).is_ok());
        }

        let joined = concat_columns(&[&a, &b]).unwrap();
        prop_assert_eq!(joined.index(), index.as_slice());
        prop_assert_eq!(joined.names(), &["x", "y"]);
    }
}

// ── 2. Outer alignment ───────────────────────────────────────────────

proptest! {
    #[test]
    fn align_outer_preserves_left_cells(
        a in arb_table(&["x", "y"]),
        b in arb_table(&["y", "z"]),
    ) {
        let (la, lb) = align_outer(&a, &b);
        prop_assert_eq!(la.index(), lb.index());
        prop_assert_eq!(la.names(), &["x", "y", "z"]);
        prop_assert_eq!(lb.names(), &["x", "y", "z"]);
        for (row, date) in a.index().iter().enumerate() {
            let target = la.index().binary_search(date).unwrap();
            for col in 0..a.width() {
                prop_assert!(same(la.value(target, col), a.value(row, col)));
            }
        }
        prop_assert!(lb.column("x").unwrap().iter().all(|v| v.is_nan()));
    }
}

// ── 3. Antisymmetric differences ─────────────────────────────────────

proptest! {
    #[test]
    fn zero_filled_difference_is_antisymmetric(
        a in arb_table(&["x", "y"]),
        b in arb_table(&["y", "z"]),
    ) {
        let diff = |l: &TimeSeriesTable, r: &TimeSeriesTable| {
            let (l, r) = align_outer(l, r);
            l.fill_nan(0.0).sub(&r.fill_nan(0.0)).unwrap()
        };
        let ab = diff(&a, &b);
        let ba = diff(&b, &a);
        for name in ["x", "y", "z"] {
            let l = ab.column(name).unwrap();
            let r = ba.column(name).unwrap();
            for (x, y) in l.iter().zip(r.iter()) {
                prop_assert!(same(*x, -*y));
            }
        }
    }
}

// ── 4. Forward fill ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn forward_reindex_keeps_target_rows(
        source in arb_table(&["bench"]),
        target in arb_index(),
    ) {
        let aligned = source.reindex(&target, Fill::Forward);
        prop_assert_eq!(aligned.index(), target.as_slice());
        for (i, date) in target.iter().enumerate() {
            let expected = match source.index().iter().rposition(|d| d <= date) {
                Some(pos) => source.value(pos, 0),
                None => f64::NAN,
            };
            prop_assert!(same(aligned.value(i, 0), expected));
        }
    }
}
