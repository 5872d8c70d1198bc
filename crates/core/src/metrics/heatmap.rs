//! Weekday-by-hour order heatmap.

use chrono::{Datelike, Timelike};
use serde::Serialize;

use super::revenue::WEEKDAYS;
use crate::types::OrderRecord;

const HOURS: usize = 24;
const DAYS: usize = 7;

/// Raw order counts, rows Monday..Sunday, columns hour 0..23 (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SalesHeatmap {
    cells: [[u32; HOURS]; DAYS],
}

impl SalesHeatmap {
    #[must_use]
    pub fn from_orders(orders: &[OrderRecord]) -> Self {
        let mut map = Self::default();
        for order in orders {
            let day = order.created_at.weekday().num_days_from_monday() as usize;
            let hour = order.created_at.hour() as usize;
            if let Some(cell) = map.cells.get_mut(day).and_then(|row| row.get_mut(hour)) {
                *cell += 1;
            }
        }
        map
    }

    /// Count for a weekday (0 = Monday) and hour.
    #[must_use]
    pub fn count(&self, day: usize, hour: usize) -> u32 {
        self.cells
            .get(day)
            .and_then(|row| row.get(hour))
            .copied()
            .unwrap_or(0)
    }

    /// Largest cell count.
    #[must_use]
    pub fn max(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Scale every cell to `round(count / max(peak, 1) * 100)`.
    ///
    /// The busiest cell maps to 100 and the scaling is monotone, so relative
    /// order between cells is kept.
    #[must_use]
    pub fn normalize(&self) -> NormalizedHeatmap {
        let peak = f64::from(self.max().max(1));
        let rows = self
            .cells
            .iter()
            .zip(WEEKDAYS)
            .map(|(row, (_, label))| HeatmapRow {
                label,
                cells: row
                    .iter()
                    .map(|&count| {
                        let percent = scale(count, peak);
                        HeatCell {
                            count,
                            percent,
                            level: HeatLevel::from_percent(percent),
                        }
                    })
                    .collect(),
            })
            .collect();
        NormalizedHeatmap { rows }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(count: u32, peak: f64) -> u8 {
    (f64::from(count) / peak * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Heatmap ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedHeatmap {
    pub rows: Vec<HeatmapRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapRow {
    pub label: &'static str,
    pub cells: Vec<HeatCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatCell {
    pub count: u32,
    /// 0..=100
    pub percent: u8,
    pub level: HeatLevel,
}

/// Colour band for a normalized cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl HeatLevel {
    #[must_use]
    pub const fn from_percent(percent: u8) -> Self {
        match percent {
            0..=20 => Self::Lowest,
            21..=40 => Self::Low,
            41..=60 => Self::Medium,
            61..=80 => Self::High,
            _ => Self::Highest,
        }
    }

    /// CSS class used by the heatmap template.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Lowest => "heat-1",
            Self::Low => "heat-2",
            Self::Medium => "heat-3",
            Self::High => "heat-4",
            Self::Highest => "heat-5",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::order;

    fn cells(map: &NormalizedHeatmap) -> Vec<HeatCell> {
        map.rows.iter().flat_map(|r| r.cells.iter().copied()).collect()
    }

    #[test]
    fn test_empty_heatmap_is_all_zero() {
        let map = SalesHeatmap::from_orders(&[]).normalize();
        assert_eq!(map.rows.len(), 7);
        assert!(map.rows.iter().all(|r| r.cells.len() == 24));
        assert!(cells(&map).iter().all(|c| c.percent == 0));
    }

    #[test]
    fn test_bucket_by_weekday_and_hour() {
        // 2024-03-04 is a Monday.
        let orders = vec![
            order("2024-03-04T14:05:00Z", "1"),
            order("2024-03-04T14:55:00Z", "1"),
            order("2024-03-10T23:00:00Z", "1"),
        ];
        let map = SalesHeatmap::from_orders(&orders);
        assert_eq!(map.count(0, 14), 2);
        assert_eq!(map.count(6, 23), 1);
        assert_eq!(map.max(), 2);
    }

    #[test]
    fn test_normalize_peak_is_100_and_order_preserved() {
        let mut orders = Vec::new();
        for (ts, n) in [
            ("2024-03-04T09:00:00Z", 7),
            ("2024-03-05T10:00:00Z", 3),
            ("2024-03-06T11:00:00Z", 1),
            ("2024-03-07T12:00:00Z", 5),
        ] {
            orders.extend(std::iter::repeat_with(|| order(ts, "1")).take(n));
        }
        let map = SalesHeatmap::from_orders(&orders).normalize();
        let all = cells(&map);

        let peak = all.iter().max_by_key(|c| c.count).unwrap();
        assert_eq!(peak.percent, 100);
        assert_eq!(peak.level, HeatLevel::Highest);

        for a in &all {
            for b in &all {
                if a.count <= b.count {
                    assert!(a.percent <= b.percent);
                }
            }
        }
    }

    #[test]
    fn test_heat_level_bands() {
        assert_eq!(HeatLevel::from_percent(0), HeatLevel::Lowest);
        assert_eq!(HeatLevel::from_percent(20), HeatLevel::Lowest);
        assert_eq!(HeatLevel::from_percent(21), HeatLevel::Low);
        assert_eq!(HeatLevel::from_percent(60), HeatLevel::Medium);
        assert_eq!(HeatLevel::from_percent(80), HeatLevel::High);
        assert_eq!(HeatLevel::from_percent(81), HeatLevel::Highest);
        assert_eq!(HeatLevel::Highest.css_class(), "heat-5");
    }
}
