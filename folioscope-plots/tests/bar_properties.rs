//! Property tests for the bar-chart renderer.
//!
//! Verifies:
//! 1. Diverging segments of every category sum to the category's row sum
//! 2. Zero cells never produce a segment or an annotation
//! 3. Total markers sit exactly at the supplied totals, stacked or grouped
//! 4. Single-column tables draw one bar per row

use folioscope_core::CategoryTable;
use folioscope_plots::bars::{
    render_bars, render_diverging_bars, stack_segments, BarOptions, BarValues, DivergingBarOptions,
};
use folioscope_plots::figure::{Axes, HAlign};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Cell values on a 0.01 grid, zero a fifth of the time.
fn arb_cell() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => (-100i32..100).prop_map(|v| v as f64 / 100.0),
        1 => Just(0.0),
    ]
}

fn arb_table() -> impl Strategy<Value = CategoryTable> {
    (1usize..8, 1usize..5).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(prop::collection::vec(arb_cell(), cols), rows).prop_map(
            move |cells| {
                let names = (0..cols).map(|c| format!("s{c}")).collect();
                let rows = cells
                    .into_iter()
                    .enumerate()
                    .map(|(r, values)| (format!("c{r}"), values))
                    .collect();
                CategoryTable::from_rows(names, rows).unwrap()
            },
        )
    })
}

fn arb_diverging_options() -> impl Strategy<Value = DivergingBarOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(perc, mid, label)| {
        DivergingBarOptions {
            bar_values: true,
            bar_perc_values: perc,
            value_at_mid: mid,
            total_label: label,
            ..DivergingBarOptions::default()
        }
    })
}

// ── 1. Diverging sums ────────────────────────────────────────────────

proptest! {
    #[test]
    fn segments_sum_to_row_totals(table in arb_table()) {
        let segments = stack_segments(&table);
        for (row, total) in table.row_totals().iter().enumerate() {
            let drawn: f64 = segments
                .iter()
                .filter(|s| s.category == row)
                .map(|s| s.value)
                .sum();
            prop_assert!((drawn - total).abs() < 1e-9);
        }
    }

    #[test]
    fn negative_stack_ends_at_zero(table in arb_table()) {
        let segments = stack_segments(&table);
        for row in 0..table.len() {
            let right_edge = segments
                .iter()
                .filter(|s| s.category == row && s.value < 0.0)
                .map(|s| s.left + s.width())
                .fold(f64::NEG_INFINITY, f64::max);
            if right_edge.is_finite() {
                prop_assert!(right_edge.abs() < 1e-9);
            }
        }
    }
}

// ── 2. Zero cells ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_cells_are_never_annotated(
        table in arb_table(),
        opts in arb_diverging_options(),
    ) {
        let zeros = table.values().filter(|v| *v == 0.0).count();
        let segments = stack_segments(&table);
        prop_assert_eq!(segments.len(), table.len() * table.width() - zeros);

        let fig = render_diverging_bars(&table, &opts, None).unwrap();
        let ax = fig.ax();
        prop_assert_eq!(ax.hbars().count(), segments.len());
        let value_labels = ax
            .texts()
            .filter(|t| !t.text.starts_with("total:"))
            .count();
        prop_assert_eq!(value_labels, segments.len());
    }
}

// ── 3. Totals markers ────────────────────────────────────────────────

proptest! {
    #[test]
    fn total_markers_match_supplied_totals(
        table in arb_table(),
        stacked in any::<bool>(),
    ) {
        let totals: Vec<f64> = (0..table.len()).map(|i| i as f64 * 0.25 - 0.5).collect();
        let opts = BarOptions {
            stacked,
            totals: Some(totals.clone()),
            legend_loc: None,
            ..BarOptions::default()
        };
        let mut ax = Axes::new();
        prop_assert!(render_bars(&table, &opts, Some(&mut ax)).is_none());

        let ticks: Vec<f64> = ax
            .hlines()
            .filter(|h| h.x_range.is_some())
            .map(|h| h.y)
            .collect();
        prop_assert_eq!(&ticks, &totals);

        let labels: Vec<(f64, bool)> = ax
            .texts()
            .filter(|t| t.h_align == HAlign::Left && t.bold)
            .map(|t| (t.y, t.bold))
            .collect();
        prop_assert_eq!(labels.len(), totals.len());
        for ((y, _), total) in labels.iter().zip(totals.iter()) {
            prop_assert_eq!(y, total);
        }
    }
}

// ── 4. Bar counts ────────────────────────────────────────────────────

#[test]
fn eleven_row_tables_draw_eleven_bars_each() {
    let series = |name: &str, scale: f64| {
        CategoryTable::from_series(
            name,
            (0..11).map(|i| (format!("strategy {i}"), scale * (i as f64 - 5.0))).collect(),
        )
    };
    let opts = BarOptions {
        bar_values: BarValues::Inline,
        ..BarOptions::default()
    };
    for table in [series("sharpe", 0.1), series("return", 0.01)] {
        let fig = render_bars(&table, &opts, None).unwrap();
        assert_eq!(fig.ax().bars().count(), 11);
    }
}

#[test]
fn one_category_two_halves_stack_to_one() {
    let table = CategoryTable::from_rows(
        vec!["a".into(), "b".into()],
        vec![("f1".into(), vec![0.5, 0.5])],
    )
    .unwrap();
    let segments = stack_segments(&table);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].left, 0.0);
    assert_eq!(segments[1].left, 0.5);
    assert_eq!(segments.iter().map(|s| s.value).sum::<f64>(), 1.0);
}
