//! Conversion funnel from sessions to purchases.

use serde::Serialize;

/// One funnel step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub label: String,
    pub count: u64,
    /// Share of the first stage, in `[0, 100]`.
    pub percent: f64,
    /// Share lost since the previous stage, in `[0, 100]`.
    pub drop_off: f64,
}

/// An ordered sequence of stages with non-increasing counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
}

impl Funnel {
    /// Build a funnel from raw `(label, count)` pairs.
    ///
    /// A stage can never hold more than the stage before it, so counts are
    /// capped at the running minimum. Percentages are relative to the first
    /// stage; an empty first stage yields 0% everywhere.
    pub fn new<I, L>(stages: I) -> Self
    where
        I: IntoIterator<Item = (L, u64)>,
        L: Into<String>,
    {
        let mut out: Vec<FunnelStage> = Vec::new();
        let mut first: Option<u64> = None;
        let mut previous: Option<u64> = None;

        for (label, raw) in stages {
            let count = previous.map_or(raw, |p| raw.min(p));
            let base = *first.get_or_insert(count);
            let drop_off = previous.map_or(0.0, |p| ratio(p - count, p));

            out.push(FunnelStage {
                label: label.into(),
                count,
                percent: ratio(count, base),
                drop_off,
            });
            previous = Some(count);
        }

        Self { stages: out }
    }

    /// Estimate a store funnel from order and abandoned-checkout counts.
    ///
    /// Shopify does not expose session analytics through the Admin API, so
    /// the upper stages are derived: sessions are at least four per order,
    /// 70% of carts reach checkout, and every order completed checkout.
    #[must_use]
    pub fn abandonment(orders: u64, abandoned_checkouts: u64) -> Self {
        let added_to_cart = abandoned_checkouts + orders;
        let sessions = (orders * 4).max(added_to_cart);
        // round-half-up of added_to_cart * 0.7
        let reached_checkout = ((added_to_cart * 7 + 5) / 10).max(orders);

        Self::new([
            ("Sessions", sessions),
            ("Added to cart", added_to_cart),
            ("Reached checkout", reached_checkout),
            ("Purchased", orders),
        ])
    }

    /// Final-stage share of the first stage.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        self.stages.last().map_or(0.0, |s| s.percent)
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(funnel: &Funnel) {
        let mut last = 100.0_f64;
        for stage in &funnel.stages {
            assert!((0.0..=100.0).contains(&stage.percent), "{stage:?}");
            assert!((0.0..=100.0).contains(&stage.drop_off), "{stage:?}");
            assert!(stage.percent <= last, "{stage:?} after {last}");
            last = stage.percent;
        }
    }

    #[test]
    fn test_funnel_percentages() {
        let funnel = Funnel::new([("a", 200), ("b", 100), ("c", 50)]);
        let pct: Vec<f64> = funnel.stages.iter().map(|s| s.percent).collect();
        assert_eq!(pct, vec![100.0, 50.0, 25.0]);
        assert!((funnel.stages[2].drop_off - 50.0).abs() < 1e-9);
        assert!((funnel.conversion_rate() - 25.0).abs() < 1e-9);
        assert_well_formed(&funnel);
    }

    #[test]
    fn test_funnel_caps_increasing_stage() {
        let funnel = Funnel::new([("a", 10), ("b", 30), ("c", 5)]);
        assert_eq!(funnel.stages[1].count, 10);
        assert_well_formed(&funnel);
    }

    #[test]
    fn test_funnel_empty_first_stage() {
        let funnel = Funnel::new([("a", 0), ("b", 0)]);
        assert!(funnel.stages.iter().all(|s| s.percent == 0.0));
        assert_well_formed(&funnel);

        let none = Funnel::new(Vec::<(String, u64)>::new());
        assert!(none.stages.is_empty());
        assert!((none.conversion_rate() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_abandonment_estimate() {
        let funnel = Funnel::abandonment(10, 30);
        let counts: Vec<u64> = funnel.stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![40, 40, 28, 10]);
        assert_well_formed(&funnel);
    }

    #[test]
    fn test_abandonment_always_well_formed() {
        for orders in 0..25 {
            for abandoned in 0..25 {
                let funnel = Funnel::abandonment(orders, abandoned);
                assert_well_formed(&funnel);
                assert_eq!(funnel.stages.last().unwrap().count, orders);
            }
        }
    }
}
