//! Tariff pricing policies consulted by [`super::connection::GridConnection`].
//!
//! The upstream Python tariff module ships only as a docstring with no
//! class bodies, so this follows the prose description directly: a flat
//! tariff with one buy/sell pair for every hour, and a time-of-use tariff
//! with named periods keyed by hour-of-day and month, falling back to a
//! default rate when no period matches.

/// One named time-of-use period.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TouPeriod {
    pub name: String,
    pub buy: f64,
    pub sell: f64,
    /// Hours of day (0-23) this period applies to.
    pub hours: Vec<u32>,
    /// Months of year (1-12) this period applies to.
    pub months: Vec<u32>,
}

impl TouPeriod {
    fn matches(&self, hour_of_day: u32, month: u32) -> bool {
        self.hours.contains(&hour_of_day) && self.months.contains(&month)
    }
}

/// A pricing policy: either a single flat rate, or a set of time-of-use
/// periods with a default fallback rate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Tariff {
    Flat { buy: f64, sell: f64 },
    Tou {
        periods: Vec<TouPeriod>,
        default_buy: f64,
        default_sell: f64,
    },
}

impl Tariff {
    pub fn flat(buy: f64, sell: f64) -> Self {
        Tariff::Flat { buy, sell }
    }

    /// `hour_of_day` in `[0, 23]`, `month` in `[1, 12]`.
    pub fn buy_price(&self, hour_of_day: u32, month: u32) -> f64 {
        match self {
            Tariff::Flat { buy, .. } => *buy,
            Tariff::Tou {
                periods,
                default_buy,
                ..
            } => periods
                .iter()
                .find(|p| p.matches(hour_of_day, month))
                .map(|p| p.buy)
                .unwrap_or(*default_buy),
        }
    }

    pub fn sell_price(&self, hour_of_day: u32, month: u32) -> f64 {
        match self {
            Tariff::Flat { sell, .. } => *sell,
            Tariff::Tou {
                periods,
                default_sell,
                ..
            } => periods
                .iter()
                .find(|p| p.matches(hour_of_day, month))
                .map(|p| p.sell)
                .unwrap_or(*default_sell),
        }
    }
}

/// An optional monthly demand-charge tariff: bills the peak kW drawn in
/// each calendar month at a fixed `$/kW` rate.
#[derive(Debug, Clone)]
pub struct DemandCharge {
    pub rate_per_kw: f64,
    monthly_peak_kw: [f64; 12],
}

impl DemandCharge {
    pub fn new(rate_per_kw: f64) -> Self {
        Self {
            rate_per_kw,
            monthly_peak_kw: [0.0; 12],
        }
    }

    pub fn record_demand(&mut self, kw: f64, month: u32) {
        let idx = (month - 1) as usize;
        if kw > self.monthly_peak_kw[idx] {
            self.monthly_peak_kw[idx] = kw;
        }
    }

    pub fn monthly_charge(&self, month: u32) -> f64 {
        self.monthly_peak_kw[(month - 1) as usize] * self.rate_per_kw
    }

    pub fn total_annual_charge(&self) -> f64 {
        self.monthly_peak_kw.iter().map(|&p| p * self.rate_per_kw).sum()
    }

    pub fn reset(&mut self) {
        self.monthly_peak_kw = [0.0; 12];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_tariff_is_constant_across_hours_and_months() {
        let t = Tariff::flat(0.12, 0.08);
        assert_eq!(t.buy_price(0, 1), t.buy_price(23, 12));
        assert_eq!(t.sell_price(0, 1), 0.08);
    }

    #[test]
    fn tou_falls_back_to_default_outside_any_period() {
        let t = Tariff::Tou {
            periods: vec![TouPeriod {
                name: "peak".into(),
                buy: 0.30,
                sell: 0.10,
                hours: (17..21).collect(),
                months: (1..=12).collect(),
            }],
            default_buy: 0.10,
            default_sell: 0.05,
        };
        assert_eq!(t.buy_price(18, 6), 0.30);
        assert_eq!(t.buy_price(3, 6), 0.10);
    }

    #[test]
    fn demand_charge_bills_the_monthly_peak_only() {
        let mut dc = DemandCharge::new(10.0);
        dc.record_demand(50.0, 3);
        dc.record_demand(30.0, 3);
        dc.record_demand(80.0, 3);
        assert_eq!(dc.monthly_charge(3), 800.0);
        assert_eq!(dc.monthly_charge(4), 0.0);
    }
}
