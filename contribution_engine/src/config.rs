//! Engine configuration loading.
//!
//! Rate and cost tables change with regulation and with the business's
//! price list, so the server reads them from a JSON file instead of
//! compiling them in.  A missing path falls back to the built-in
//! defaults in [`crate::rates`].

use crate::models::CalculationInput;
use crate::rates::{ContributionRateTable, ProcedureCostTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV: &str = "COTIZADOR_CONFIG";

/// The two policy tables the engine prices against.
///
/// Either section may be omitted from the JSON file, in which case the
/// default table is used for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rates: ContributionRateTable,
    pub costs: ProcedureCostTable,
}

impl EngineConfig {
    /// A fresh input matching this configuration's minimum wage.
    pub fn default_input(&self) -> CalculationInput {
        CalculationInput::with_rates(&self.rates)
    }
}

/// Loads and validates a configuration file.
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading engine config {:?}", path))?;
    let config: EngineConfig = serde_json::from_str(&data)
        .with_context(|| format!("parsing engine config {:?}", path))?;
    config
        .rates
        .validate()
        .with_context(|| format!("rate table in {:?}", path))?;
    config
        .costs
        .validate()
        .with_context(|| format!("cost table in {:?}", path))?;
    Ok(config)
}

/// Loads the configuration named by `path`, or the defaults when no
/// path is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = load_config_file(path)?;
            info!(
                path = %path.display(),
                procedures = config.costs.procedures.len(),
                "loaded engine config"
            );
            Ok(config)
        }
        None => {
            info!("no engine config given, using default tables");
            Ok(EngineConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_missing_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_input().contribution_base, dec!(1423500));
    }

    #[test]
    fn test_partial_file_overrides_rates_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut rates = serde_json::to_value(ContributionRateTable::default()).unwrap();
        rates["minimum_wage"] = serde_json::json!(1300000);
        write!(file, "{}", serde_json::json!({ "rates": rates })).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.rates.minimum_wage, dec!(1300000));
        assert_eq!(config.costs, ProcedureCostTable::default());
        assert_eq!(config.default_input().monthly_income, dec!(1300000));
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let costs = serde_json::json!([
            {"key": "a", "label": "A", "amount": 1000},
            {"key": "a", "label": "B", "amount": 2000}
        ]);
        write!(file, "{}", serde_json::json!({ "costs": costs })).unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate procedure key"));
    }

    #[test]
    fn test_unreadable_file_reports_path() {
        let err = load_config(Some(Path::new("/nonexistent/cotizador.json"))).unwrap_err();
        assert!(err.to_string().contains("cotizador.json"));
    }
}
