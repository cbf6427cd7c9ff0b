use crate::color::regime_color;
use crate::figure::{date_x, Axes, Span};
use folioscope_core::RegimeSpan;

/// Shade date-axis panels by benchmark regime. Spans are drawn in the order
/// given, so earlier periods sit underneath later ones.
pub fn add_regime_shadows(ax: &mut Axes, regimes: &[RegimeSpan], alpha: f64) {
    for span in regimes {
        ax.push(Span {
            x0: date_x(span.start),
            x1: date_x(span.end),
            color: regime_color(span.regime),
            alpha,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use folioscope_core::Regime;

    #[test]
    fn one_span_per_regime_period() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let regimes = [
            RegimeSpan { start: d(1), end: d(2), regime: Regime::Bear },
            RegimeSpan { start: d(2), end: d(3), regime: Regime::Bull },
        ];
        let mut ax = Axes::new();
        add_regime_shadows(&mut ax, &regimes, 0.3);
        let spans: Vec<&Span> = ax.spans().collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].color, regime_color(Regime::Bull));
        assert_eq!(spans[0].x1, spans[1].x0);
    }
}
