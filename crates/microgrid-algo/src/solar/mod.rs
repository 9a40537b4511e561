//! Abbreviated PV generation pipeline.
//!
//! Spencer solar position → Perez-style plane-of-array transposition → NOCT
//! cell temperature → single-diode MPP (solved via the Lambert-W closed form
//! of the explicit I-V relation) → fixed BOS derate → annual degradation.
//! Night-time (`zenith >= 90°`) short-circuits straight to zero.

use microgrid_core::config::{SolarPvConfig, WeatherBundle};
use microgrid_core::timeseries::HourlySeries;

/// Single-diode equivalent-circuit parameters at STC, scaled per module.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ModuleParams {
    pub i_l_stc: f64,
    pub i_0_stc: f64,
    pub r_s: f64,
    pub r_sh: f64,
    pub n_diode: f64,
    pub module_wp: f64,
}

impl Default for ModuleParams {
    /// Representative 400 Wp crystalline-silicon module.
    fn default() -> Self {
        Self {
            i_l_stc: 10.5,
            i_0_stc: 1e-10,
            r_s: 0.3,
            r_sh: 300.0,
            n_diode: 1.2,
            module_wp: 400.0,
        }
    }
}

const THERMAL_VOLTAGE_AT_STC: f64 = 0.02585; // kT/q at ~300 K, volts
const BOS_DERATE: f64 = 0.9 * 0.98 * 0.99 * 0.995 * 0.98; // soiling*shading*wiring*avail*LID

fn solar_declination_rad(day_of_year: f64) -> f64 {
    // Spencer (1971) Fourier-series approximation.
    let gamma = 2.0 * std::f64::consts::PI * (day_of_year - 1.0) / 365.0;
    0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin() - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin()
}

/// Solar zenith angle in radians for the given hour-of-year and site.
fn solar_zenith_rad(hour_of_year: usize, latitude_deg: f64) -> f64 {
    let day_of_year = (hour_of_year / 24) as f64 + 1.0;
    let hour_of_day = (hour_of_year % 24) as f64;
    let decl = solar_declination_rad(day_of_year);
    let hour_angle = (hour_of_day - 12.0) * 15.0_f64.to_radians();
    let lat = latitude_deg.to_radians();

    let cos_zenith = lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos();
    cos_zenith.clamp(-1.0, 1.0).acos()
}

/// Plane-of-array irradiance (W/m^2) from GHI/DNI using a simplified
/// isotropic-diffuse transposition (the Perez anisotropic circumsolar and
/// horizon-brightening terms reduce to this in the absence of sky-clearness
/// index data, which the abbreviated pipeline does not model).
fn poa_irradiance(ghi: f64, dni: f64, zenith_rad: f64, tilt_rad: f64) -> f64 {
    if zenith_rad >= std::f64::consts::FRAC_PI_2 {
        return 0.0;
    }
    let dhi = (ghi - dni * zenith_rad.cos()).max(0.0);
    let beam = dni * (zenith_rad.cos() * tilt_rad.cos()).max(0.0);
    let diffuse = dhi * (1.0 + tilt_rad.cos()) / 2.0;
    (beam + diffuse).max(0.0)
}

fn noct_cell_temp(ambient_c: f64, poa_w_m2: f64, noct_c: f64) -> f64 {
    ambient_c + (noct_c - 20.0) / 800.0 * poa_w_m2
}

/// Principal branch of the Lambert W function via Halley's method.
fn lambert_w0(x: f64) -> f64 {
    if x <= -1.0 / std::f64::consts::E {
        return -1.0;
    }
    let mut w = if x < 1.0 {
        x * (1.0 - x + 1.5 * x * x)
    } else {
        x.ln() - x.ln().ln().max(0.0)
    };
    for _ in 0..20 {
        let ew = w.exp();
        let f = w * ew - x;
        let denom = ew * (w + 1.0) - (w + 2.0) * f / (2.0 * w + 2.0).max(1e-12);
        if denom.abs() < 1e-18 {
            break;
        }
        let delta = f / denom;
        w -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    w
}

/// Explicit single-diode I(V) via the Jain & Kapoor (2004) closed form.
fn single_diode_current(v: f64, p: &ModuleParams, vt: f64) -> f64 {
    let (rs, rsh, il, i0, n) = (p.r_s, p.r_sh, p.i_l_stc, p.i_0_stc, p.n_diode);
    let nvt = n * vt;
    let arg = (rs * rsh * i0) / (nvt * (rsh + rs))
        * ((rsh * (rs * (il + i0) + v)) / (nvt * (rsh + rs))).exp();
    (rsh * (il + i0) - v) / (rsh + rs) - (nvt / rs) * lambert_w0(arg)
}

/// Maximum power point (W) for one module at the given effective
/// irradiance ratio and cell temperature, via a fine voltage sweep.
fn module_mpp_w(irradiance_ratio: f64, cell_temp_c: f64, p: &ModuleParams, temp_coeff_pct_c: f64) -> f64 {
    if irradiance_ratio <= 0.0 {
        return 0.0;
    }
    let mut scaled = *p;
    scaled.i_l_stc = p.i_l_stc * irradiance_ratio;
    let vt = THERMAL_VOLTAGE_AT_STC * (273.15 + cell_temp_c) / 298.15;

    let v_oc_approx = scaled.n_diode * vt * (scaled.i_l_stc / scaled.i_0_stc).max(1.0).ln();
    let steps = 200;
    let mut best_power = 0.0;
    for i in 1..steps {
        let v = v_oc_approx * (i as f64) / (steps as f64);
        let i_out = single_diode_current(v, &scaled, vt).max(0.0);
        let power = v * i_out;
        if power > best_power {
            best_power = power;
        }
    }
    let temp_factor = 1.0 + temp_coeff_pct_c / 100.0 * (cell_temp_c - 25.0);
    (best_power * temp_factor).max(0.0)
}

/// Simulates an array sized to meet `capacity_kwp` at STC and returns
/// `pv_kw[8760]` at the AC bus.
pub fn simulate(
    config: &SolarPvConfig,
    weather: &WeatherBundle,
    latitude_deg: f64,
    module: &ModuleParams,
    degradation_per_year: f64,
    year: u32,
) -> HourlySeries {
    let module_count = (config.rated_kw * 1000.0 / module.module_wp).ceil().max(1.0);
    let degradation_factor = (1.0 - degradation_per_year).powi(year as i32);

    let tilt_rad = config.tilt_deg.to_radians();
    let mut values = Vec::with_capacity(8_760);

    for hour in 0..8_760 {
        let zenith = solar_zenith_rad(hour, latitude_deg);
        if zenith >= std::f64::consts::FRAC_PI_2 {
            values.push(0.0);
            continue;
        }

        let ghi = weather.ghi_w_m2.get(hour);
        let dni = weather.dni_w_m2.get(hour);
        let ambient = weather.ambient_temp_c.get(hour);

        let poa = poa_irradiance(ghi, dni, zenith, tilt_rad);
        if poa <= 0.0 {
            values.push(0.0);
            continue;
        }

        let cell_temp = noct_cell_temp(ambient, poa, config.noct_c);
        let irradiance_ratio = poa / 1000.0;
        let dc_w = module_mpp_w(irradiance_ratio, cell_temp, module, config.temp_coeff_pct_per_c)
            * module_count;

        let ac_kw = (dc_w / 1000.0) * config.derate_factor * BOS_DERATE * degradation_factor;
        values.push(ac_kw.max(0.0));
    }

    HourlySeries::new(&config.name, values).expect("pipeline always emits 8760 samples")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_weather(ghi: f64, dni: f64, temp: f64) -> WeatherBundle {
        WeatherBundle {
            ghi_w_m2: HourlySeries::new("ghi", vec![ghi; 8_760]).unwrap(),
            dni_w_m2: HourlySeries::new("dni", vec![dni; 8_760]).unwrap(),
            ambient_temp_c: HourlySeries::new("tamb", vec![temp; 8_760]).unwrap(),
            wind_speed_ms: HourlySeries::new("wind", vec![0.0; 8_760]).unwrap(),
        }
    }

    #[test]
    fn zero_irradiance_yields_zero_output() {
        let cfg = SolarPvConfig::default();
        let weather = flat_weather(0.0, 0.0, 25.0);
        let out = simulate(&cfg, &weather, -17.7, &ModuleParams::default(), 0.005, 0);
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn midday_full_sun_produces_positive_output() {
        let cfg = SolarPvConfig::default();
        let weather = flat_weather(900.0, 800.0, 25.0);
        let out = simulate(&cfg, &weather, -17.7, &ModuleParams::default(), 0.005, 0);
        let noon = out.get(12);
        assert!(noon > 0.0);
    }

    #[test]
    fn degradation_reduces_output_in_later_years() {
        let cfg = SolarPvConfig::default();
        let weather = flat_weather(900.0, 800.0, 25.0);
        let year0 = simulate(&cfg, &weather, -17.7, &ModuleParams::default(), 0.005, 0);
        let year10 = simulate(&cfg, &weather, -17.7, &ModuleParams::default(), 0.005, 10);
        assert!(year10.get(12) < year0.get(12));
    }

    #[test]
    fn lambert_w_matches_known_value_at_zero() {
        assert!((lambert_w0(0.0)).abs() < 1e-6);
    }
}
