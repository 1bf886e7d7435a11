//! Contribution rate and procedure cost tables.
//!
//! The `rates` module holds the policy data the engine prices against:
//! the percentage rates for each contribution category and the flat
//! fees charged for administrative procedures.  Both tables are plain
//! serialisable data so they can be shipped as JSON by whatever
//! manages configuration; [`crate::config`] loads them from disk.

use crate::error::{EngineError, EngineResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of occupational risk classes.
pub const RISK_CLASSES: usize = 5;

/// Health contribution rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRates {
    pub independent_rate: Decimal,
    pub dependent_employee_rate: Decimal,
    pub dependent_employer_rate: Decimal,
}

/// Pension contribution rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PensionRates {
    pub independent_rate: Decimal,
    pub dependent_employee_rate: Decimal,
    pub dependent_employer_rate: Decimal,
}

/// Family compensation fund rates.
///
/// Dependent workers always pay the fixed `dependent_rate`.  Independent
/// contributors choose one of `independent_options`, where `0` means they
/// are not affiliated to a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyCompensationRates {
    pub dependent_rate: Decimal,
    pub independent_options: Vec<Decimal>,
}

/// The full set of percentage rates used to price contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRateTable {
    /// Legal minimum monthly wage.  Contribution bases below it are
    /// flagged with an advisory.
    pub minimum_wage: Decimal,
    /// Share of an independent contributor's monthly income that forms
    /// the contribution base when it is derived automatically.
    pub independent_income_ratio: Decimal,
    pub health: HealthRates,
    pub pension: PensionRates,
    /// Occupational risk (ARL) rates indexed by risk class 1..=5.
    pub occupational_risk: Vec<Decimal>,
    pub family_compensation: FamilyCompensationRates,
}

impl Default for ContributionRateTable {
    fn default() -> Self {
        Self {
            minimum_wage: dec!(1423500),
            independent_income_ratio: dec!(0.4),
            health: HealthRates {
                independent_rate: dec!(0.125),
                dependent_employee_rate: dec!(0.04),
                dependent_employer_rate: dec!(0.085),
            },
            pension: PensionRates {
                independent_rate: dec!(0.16),
                dependent_employee_rate: dec!(0.04),
                dependent_employer_rate: dec!(0.12),
            },
            occupational_risk: vec![
                dec!(0.00522),
                dec!(0.01044),
                dec!(0.02436),
                dec!(0.0435),
                dec!(0.0696),
            ],
            family_compensation: FamilyCompensationRates {
                dependent_rate: dec!(0.04),
                independent_options: vec![dec!(0), dec!(0.006), dec!(0.02)],
            },
        }
    }
}

impl ContributionRateTable {
    /// Returns the occupational risk rate for a 1-based risk class.
    pub fn risk_rate(&self, class: u8) -> EngineResult<Decimal> {
        if class == 0 || usize::from(class) > self.occupational_risk.len() {
            return Err(EngineError::invalid(format!(
                "occupational risk class {} is outside 1..={}",
                class,
                self.occupational_risk.len()
            )));
        }
        Ok(self.occupational_risk[usize::from(class) - 1])
    }

    /// Checks the structural invariants of the table.
    ///
    /// Every rate must lie in `[0, 1]`, the risk list must hold exactly
    /// five entries, the independent family compensation options must
    /// include `0`, and the minimum wage must be positive.
    pub fn validate(&self) -> EngineResult<()> {
        if self.minimum_wage <= Decimal::ZERO {
            return Err(EngineError::invalid("minimum_wage must be positive"));
        }
        check_rate("independent_income_ratio", self.independent_income_ratio)?;
        check_rate("health.independent_rate", self.health.independent_rate)?;
        check_rate("health.dependent_employee_rate", self.health.dependent_employee_rate)?;
        check_rate("health.dependent_employer_rate", self.health.dependent_employer_rate)?;
        check_rate("pension.independent_rate", self.pension.independent_rate)?;
        check_rate("pension.dependent_employee_rate", self.pension.dependent_employee_rate)?;
        check_rate("pension.dependent_employer_rate", self.pension.dependent_employer_rate)?;
        check_rate(
            "family_compensation.dependent_rate",
            self.family_compensation.dependent_rate,
        )?;

        if self.occupational_risk.len() != RISK_CLASSES {
            return Err(EngineError::invalid(format!(
                "occupational_risk must have {} entries, found {}",
                RISK_CLASSES,
                self.occupational_risk.len()
            )));
        }
        for (i, rate) in self.occupational_risk.iter().enumerate() {
            check_rate(&format!("occupational_risk[{}]", i), *rate)?;
        }

        let options = &self.family_compensation.independent_options;
        for (i, rate) in options.iter().enumerate() {
            check_rate(&format!("family_compensation.independent_options[{}]", i), *rate)?;
        }
        if !options.iter().any(|r| r.is_zero()) {
            return Err(EngineError::invalid(
                "family_compensation.independent_options must include 0",
            ));
        }
        Ok(())
    }
}

fn check_rate(field: &str, rate: Decimal) -> EngineResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(EngineError::invalid(format!(
            "{} must be between 0 and 1, found {}",
            field, rate
        )));
    }
    Ok(())
}

/// A flat fee for an administrative procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureCost {
    /// Stable identifier used by [`crate::models::CalculationInput::charged_procedures`].
    pub key: String,
    /// Label shown on the breakdown.
    pub label: String,
    pub amount: Decimal,
}

impl ProcedureCost {
    pub fn new(key: &str, label: &str, amount: Decimal) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            amount,
        }
    }
}

/// Ordered procedure fees.  Charged procedures appear on a breakdown in
/// the order they are listed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcedureCostTable {
    pub procedures: Vec<ProcedureCost>,
}

impl Default for ProcedureCostTable {
    fn default() -> Self {
        Self {
            procedures: vec![
                ProcedureCost::new("pension_affiliation", "Afiliación a pensión", dec!(15000)),
                ProcedureCost::new("health_affiliation", "Afiliación a salud", dec!(15000)),
                ProcedureCost::new("arl_affiliation", "Afiliación a ARL", dec!(15000)),
                ProcedureCost::new(
                    "family_fund_affiliation",
                    "Afiliación a caja de compensación",
                    dec!(15000),
                ),
                ProcedureCost::new(
                    "pension_portal_creation",
                    "Creación de usuario en portal de pensión",
                    dec!(5000),
                ),
                ProcedureCost::new(
                    "health_portal_creation",
                    "Creación de usuario en portal de salud",
                    dec!(5000),
                ),
                ProcedureCost::new(
                    "arl_portal_creation",
                    "Creación de usuario en portal de ARL",
                    dec!(5000),
                ),
                ProcedureCost::new("planilla_liquidation", "Liquidación de planilla", dec!(5000)),
                ProcedureCost::new("planilla_correction", "Corrección de planilla", dec!(5000)),
                ProcedureCost::new("certificate_issuance", "Expedición de certificados", dec!(5000)),
            ],
        }
    }
}

impl ProcedureCostTable {
    pub fn get(&self, key: &str) -> Option<&ProcedureCost> {
        self.procedures.iter().find(|p| p.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys must be unique and non-empty and every fee non-negative.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for (i, procedure) in self.procedures.iter().enumerate() {
            if procedure.key.trim().is_empty() {
                return Err(EngineError::invalid(format!("procedures[{}].key is empty", i)));
            }
            if !seen.insert(procedure.key.as_str()) {
                return Err(EngineError::invalid(format!(
                    "duplicate procedure key '{}'",
                    procedure.key
                )));
            }
            if procedure.amount < Decimal::ZERO {
                return Err(EngineError::invalid(format!(
                    "procedure '{}' has a negative cost",
                    procedure.key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_valid() {
        assert!(ContributionRateTable::default().validate().is_ok());
        let costs = ProcedureCostTable::default();
        assert!(costs.validate().is_ok());
        assert_eq!(costs.procedures.len(), 10);
        assert!(costs
            .procedures
            .iter()
            .all(|p| p.amount == dec!(15000) || p.amount == dec!(5000)));
    }

    #[test]
    fn test_risk_rate_lookup() {
        let rates = ContributionRateTable::default();
        assert_eq!(rates.risk_rate(1).unwrap(), dec!(0.00522));
        assert_eq!(rates.risk_rate(5).unwrap(), dec!(0.0696));
        assert!(matches!(rates.risk_rate(0), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(rates.risk_rate(6), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_rate_above_one_is_rejected() {
        let mut rates = ContributionRateTable::default();
        rates.pension.independent_rate = dec!(1.5);
        let err = rates.validate().unwrap_err();
        assert!(err.to_string().contains("pension.independent_rate"));
    }

    #[test]
    fn test_short_risk_table_is_rejected() {
        let mut rates = ContributionRateTable::default();
        rates.occupational_risk.pop();
        assert!(rates.validate().is_err());
    }

    #[test]
    fn test_family_options_must_include_zero() {
        let mut rates = ContributionRateTable::default();
        rates.family_compensation.independent_options = vec![dec!(0.02)];
        assert!(rates.validate().is_err());
    }

    #[test]
    fn test_duplicate_procedure_key_is_rejected() {
        let mut costs = ProcedureCostTable::default();
        costs
            .procedures
            .push(ProcedureCost::new("arl_affiliation", "Otra", dec!(1000)));
        let err = costs.validate().unwrap_err();
        assert!(err.to_string().contains("arl_affiliation"));
    }

    #[test]
    fn test_cost_table_deserializes_from_plain_list() {
        let json = r#"[{"key": "visita", "label": "Visita", "amount": 20000}]"#;
        let costs: ProcedureCostTable = serde_json::from_str(json).unwrap();
        assert_eq!(costs.get("visita").unwrap().amount, dec!(20000));
        assert!(!costs.contains("arl_affiliation"));
    }
}
