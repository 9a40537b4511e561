//! Bi-directional grid interconnection with metering and billing.
//!
//! Represents the point of common coupling between a microgrid and the
//! utility grid: import/export is clamped to interconnection limits, priced
//! by the attached [`Tariff`], and optionally billed a monthly demand charge.

use microgrid_core::config::GridConnectionConfig;
use microgrid_core::error::{CoreError, CoreResult};

use super::tariff::{DemandCharge, Tariff};

pub struct GridConnection {
    pub max_import_kw: f64,
    pub max_export_kw: f64,
    pub tariff: Tariff,
    pub sell_back_enabled: bool,
    pub net_metering: bool,
    pub demand_charge: Option<DemandCharge>,

    total_import_kwh: f64,
    total_export_kwh: f64,
    total_cost: f64,
    monthly_peaks: [f64; 12],
    monthly_import_kwh: [f64; 12],
    monthly_export_kwh: [f64; 12],
}

impl GridConnection {
    pub fn new(config: &GridConnectionConfig, tariff: Tariff) -> CoreResult<Self> {
        if config.max_import_kw < 0.0 || config.max_export_kw < 0.0 {
            return Err(CoreError::config(
                "max_import_kw/max_export_kw",
                "must be >= 0",
            ));
        }
        Ok(Self {
            max_import_kw: config.max_import_kw,
            max_export_kw: config.max_export_kw,
            tariff,
            sell_back_enabled: config.sell_back_enabled,
            net_metering: config.net_metering,
            demand_charge: None,
            total_import_kwh: 0.0,
            total_export_kwh: 0.0,
            total_cost: 0.0,
            monthly_peaks: [0.0; 12],
            monthly_import_kwh: [0.0; 12],
            monthly_export_kwh: [0.0; 12],
        })
    }

    pub fn with_demand_charge(mut self, demand_charge: DemandCharge) -> Self {
        self.demand_charge = Some(demand_charge);
        self
    }

    /// Imports up to `max_import_kw` of `kw_needed`. Returns `(actual_kw, cost)`.
    pub fn import_power(&mut self, kw_needed: f64, hour_of_day: u32, month: u32) -> (f64, f64) {
        if kw_needed <= 0.0 {
            return (0.0, 0.0);
        }
        let actual_kw = kw_needed.min(self.max_import_kw);
        let energy_kwh = actual_kw;
        let price = self.tariff.buy_price(hour_of_day, month);
        let cost = energy_kwh * price;

        self.total_import_kwh += energy_kwh;
        self.total_cost += cost;
        let idx = (month - 1) as usize;
        self.monthly_import_kwh[idx] += energy_kwh;
        if actual_kw > self.monthly_peaks[idx] {
            self.monthly_peaks[idx] = actual_kw;
        }
        if let Some(dc) = &mut self.demand_charge {
            dc.record_demand(actual_kw, month);
        }

        (actual_kw, cost)
    }

    /// Exports up to `max_export_kw` of `kw_excess`. Returns `(actual_kw, revenue)`.
    /// Under net metering, export is valued at the buy rate instead of sell.
    pub fn export_power(&mut self, kw_excess: f64, hour_of_day: u32, month: u32) -> (f64, f64) {
        if kw_excess <= 0.0 || !self.sell_back_enabled {
            return (0.0, 0.0);
        }
        let actual_kw = kw_excess.min(self.max_export_kw);
        let energy_kwh = actual_kw;
        let price = if self.net_metering {
            self.tariff.buy_price(hour_of_day, month)
        } else {
            self.tariff.sell_price(hour_of_day, month)
        };
        let revenue = energy_kwh * price;

        self.total_export_kwh += energy_kwh;
        self.total_cost -= revenue;
        self.monthly_export_kwh[(month - 1) as usize] += energy_kwh;

        (actual_kw, revenue)
    }

    pub fn monthly_demand_charge(&self, month: u32) -> f64 {
        self.demand_charge
            .as_ref()
            .map(|dc| dc.monthly_charge(month))
            .unwrap_or(0.0)
    }

    pub fn total_demand_charges(&self) -> f64 {
        self.demand_charge
            .as_ref()
            .map(|dc| dc.total_annual_charge())
            .unwrap_or(0.0)
    }

    /// Net kWh for a month: positive is net import, negative is net export.
    pub fn net_metering_balance(&self, month: u32) -> f64 {
        let idx = (month - 1) as usize;
        self.monthly_import_kwh[idx] - self.monthly_export_kwh[idx]
    }

    /// Total net grid cost including demand charges ($); negative means a
    /// net credit from exports exceeding import spend.
    pub fn net_cost(&self) -> f64 {
        self.total_cost + self.total_demand_charges()
    }

    pub fn total_import_kwh(&self) -> f64 {
        self.total_import_kwh
    }

    pub fn total_export_kwh(&self) -> f64 {
        self.total_export_kwh
    }

    pub fn reset(&mut self) {
        self.total_import_kwh = 0.0;
        self.total_export_kwh = 0.0;
        self.total_cost = 0.0;
        self.monthly_peaks = [0.0; 12];
        self.monthly_import_kwh = [0.0; 12];
        self.monthly_export_kwh = [0.0; 12];
        if let Some(dc) = &mut self.demand_charge {
            dc.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GridConnectionConfig {
        GridConnectionConfig {
            name: "grid".into(),
            max_import_kw: 1000.0,
            max_export_kw: 500.0,
            net_metering: false,
            ..GridConnectionConfig::default()
        }
    }

    #[test]
    fn import_clamps_to_interconnection_limit() {
        let mut gc = GridConnection::new(&config(), Tariff::flat(0.12, 0.08)).unwrap();
        let (actual, cost) = gc.import_power(2000.0, 12, 6);
        assert_eq!(actual, 1000.0);
        assert!((cost - 120.0).abs() < 1e-9);
    }

    #[test]
    fn flat_tariff_pure_grid_scenario_matches_expected_annual_cost() {
        let mut gc = GridConnection::new(&config(), Tariff::flat(0.12, 0.08)).unwrap();
        for h in 0..8760u32 {
            gc.import_power(10.0, h % 24, (h / 730).min(11) + 1);
        }
        assert!((gc.total_import_kwh() - 87_600.0).abs() < 1e-6);
        assert!((gc.net_cost() - 10_512.0).abs() < 1e-3);
    }

    #[test]
    fn net_metering_values_export_at_buy_rate() {
        let mut config = config();
        config.net_metering = true;
        let mut gc = GridConnection::new(&config, Tariff::flat(0.12, 0.05)).unwrap();
        let (_, revenue) = gc.export_power(10.0, 12, 6);
        assert!((revenue - 1.2).abs() < 1e-9);
    }

    #[test]
    fn disabling_sell_back_exports_nothing() {
        let mut gc = GridConnection::new(&config(), Tariff::flat(0.12, 0.08)).unwrap();
        gc.sell_back_enabled = false;
        let (actual, revenue) = gc.export_power(50.0, 12, 6);
        assert_eq!(actual, 0.0);
        assert_eq!(revenue, 0.0);
    }
}
