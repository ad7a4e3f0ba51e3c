use crate::errors::{PricingError, PricingResult};
use crate::option::{OptionSpec, OptionType};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub maturity: f64,
    pub volatility: f64,
    pub option_type: OptionType,
    pub lattice_steps: usize,
    pub preset_u: Option<f64>,
    pub preset_d: Option<f64>,
    pub convergence_steps: Vec<usize>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> PricingResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> PricingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let option_type = var_or("OPTION_TYPE", "call")
            .parse::<OptionType>()
            .map_err(|e| PricingError::Config(format!("OPTION_TYPE: {e}")))?;

        let lattice_steps = var_or("LATTICE_STEPS", "200")
            .parse::<usize>()
            .map_err(|e| PricingError::Config(format!("LATTICE_STEPS: {e}")))?;

        let convergence_steps = parse_steps_list(&var_or("CONVERGENCE_STEPS", "50,200,1000"))?;

        Ok(Self {
            spot: parse_f64("OPTION_SPOT", &var_or("OPTION_SPOT", "100"))?,
            strike: parse_f64("OPTION_STRIKE", &var_or("OPTION_STRIKE", "100"))?,
            rate: parse_f64("OPTION_RATE", &var_or("OPTION_RATE", "0.05"))?,
            maturity: parse_f64("OPTION_MATURITY", &var_or("OPTION_MATURITY", "1.0"))?,
            volatility: parse_f64("OPTION_VOLATILITY", &var_or("OPTION_VOLATILITY", "0.2"))?,
            option_type,
            lattice_steps,
            preset_u: lookup("LATTICE_UP").map(|v| parse_f64("LATTICE_UP", &v)).transpose()?,
            preset_d: lookup("LATTICE_DOWN").map(|v| parse_f64("LATTICE_DOWN", &v)).transpose()?,
            convergence_steps,
        })
    }

    /// Validated contract from the configured fields.
    pub fn option_spec(&self) -> PricingResult<OptionSpec> {
        OptionSpec::new(
            self.spot,
            self.strike,
            self.rate,
            self.maturity,
            self.volatility,
            self.option_type,
        )
    }
}

fn parse_f64(key: &str, raw: &str) -> PricingResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| PricingError::Config(format!("{key}: {e}")))
}

fn parse_steps_list(raw: &str) -> PricingResult<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| PricingError::Config(format!("CONVERGENCE_STEPS: {s:?}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.spot, 100.0);
        assert_eq!(cfg.strike, 100.0);
        assert_eq!(cfg.rate, 0.05);
        assert_eq!(cfg.maturity, 1.0);
        assert_eq!(cfg.volatility, 0.2);
        assert_eq!(cfg.option_type, OptionType::Call);
        assert_eq!(cfg.lattice_steps, 200);
        assert_eq!(cfg.preset_u, None);
        assert_eq!(cfg.preset_d, None);
        assert_eq!(cfg.convergence_steps, vec![50, 200, 1000]);
        assert!(cfg.option_spec().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("OPTION_SPOT", "42.5"),
            ("OPTION_TYPE", "Put"),
            ("OPTION_RATE", "-0.01"),
            ("LATTICE_STEPS", "10"),
            ("LATTICE_UP", "1.1"),
            ("LATTICE_DOWN", " 0.9 "),
            ("CONVERGENCE_STEPS", "10, 20,,40"),
        ]))
        .unwrap();
        assert_eq!(cfg.spot, 42.5);
        assert_eq!(cfg.option_type, OptionType::Put);
        assert_eq!(cfg.rate, -0.01);
        assert_eq!(cfg.lattice_steps, 10);
        assert_eq!(cfg.preset_u, Some(1.1));
        assert_eq!(cfg.preset_d, Some(0.9));
        assert_eq!(cfg.convergence_steps, vec![10, 20, 40]);
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        for (key, value) in [
            ("OPTION_SPOT", "abc"),
            ("OPTION_TYPE", "straddle"),
            ("LATTICE_STEPS", "-3"),
            ("LATTICE_UP", "up"),
            ("CONVERGENCE_STEPS", "50,x"),
        ] {
            let res = AppConfig::from_lookup(lookup_from(&[(key, value)]));
            assert!(
                matches!(res, Err(PricingError::Config(ref msg)) if msg.starts_with(key)),
                "{key}={value} should fail as config error, got {res:?}"
            );
        }
    }

    #[test]
    fn test_invalid_spec_surfaces_at_option_spec() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("OPTION_MATURITY", "0")])).unwrap();
        assert!(matches!(cfg.option_spec(), Err(PricingError::InvalidParameter(_))));
    }
}
