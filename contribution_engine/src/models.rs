//! Data models for the Contribution Engine.
//!
//! The `models` module defines the serialisable structs and enums that
//! form the engine's input and output.  A [`CalculationInput`] collects
//! every toggle and amount a quote depends on; the engine turns it into
//! a [`CalculationOutput`] without mutating anything.  Both derive
//! `Serialize` and `Deserialize` so they can be persisted as profiles or
//! sent over the wire unchanged.

use crate::rates::ContributionRateTable;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Contribution regime of the person being quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Self-employed contributor paying every share.
    #[default]
    Independent,
    /// Employee whose contributions are split with an employer.
    Dependent,
}

/// A free-form extra charge or discount appended to the procedure
/// section.  Negative amounts represent discounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalLineItem {
    /// Human-readable description.  Must not be empty.
    pub description: String,
    pub amount: Decimal,
}

/// Everything a quote depends on.
///
/// A hosting application keeps one of these as long-lived state, mutates
/// it field by field and calls [`crate::engine::compute`] after every
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationInput {
    pub modality: Modality,
    /// Declared monthly income.  Only used when `auto_base` applies.
    pub monthly_income: Decimal,
    /// For independent contributors, derive the contribution base from
    /// `monthly_income` instead of using `contribution_base` verbatim.
    pub auto_base: bool,
    /// Contribution base (IBC) for a full month.
    pub contribution_base: Decimal,
    /// Days worked in the period.  The base is prorated over 30 days.
    pub worked_days: u32,
    pub include_pension: bool,
    pub include_health: bool,
    pub include_occupational_risk: bool,
    /// Risk class 1..=5; only checked when occupational risk is included.
    pub occupational_risk_class: u8,
    /// `0` leaves family compensation out.  Independent contributors must
    /// pick one of the rate table's options; for dependent workers any
    /// positive value switches on the fixed dependent rate.
    pub family_compensation_rate: Decimal,
    /// Keys of the procedures to charge for.
    pub charged_procedures: BTreeSet<String>,
    /// Administration fee, applied to dependent workers only.
    pub admin_fee: Decimal,
    pub additional_items: Vec<AdditionalLineItem>,
}

impl Default for CalculationInput {
    fn default() -> Self {
        Self::with_rates(&ContributionRateTable::default())
    }
}

impl CalculationInput {
    /// Default input for a given rate table: an independent contributor
    /// whose income lands them on the minimum wage base, a full month,
    /// pension and health on, everything else off.
    pub fn with_rates(rates: &ContributionRateTable) -> Self {
        Self {
            modality: Modality::Independent,
            monthly_income: rates.minimum_wage,
            auto_base: true,
            contribution_base: rates.minimum_wage,
            worked_days: 30,
            include_pension: true,
            include_health: true,
            include_occupational_risk: false,
            occupational_risk_class: 1,
            family_compensation_rate: Decimal::ZERO,
            charged_procedures: BTreeSet::new(),
            admin_fee: Decimal::ZERO,
            additional_items: Vec::new(),
        }
    }

    /// Switches the charge flag of a procedure on or off.
    pub fn set_charge(&mut self, key: &str, charged: bool) {
        if charged {
            self.charged_procedures.insert(key.to_string());
        } else {
            self.charged_procedures.remove(key);
        }
    }
}

/// What a line on the breakdown stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineCategory {
    Health,
    HealthEmployee,
    HealthEmployer,
    Pension,
    OccupationalRisk,
    FamilyCompensation,
    Procedure { key: String },
    AdminFee,
    Additional,
}

/// A single priced line of the breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    /// Unrounded amount.  Rounding happens only when formatting.
    pub amount: Decimal,
    pub category: LineCategory,
}

impl LineItem {
    pub fn new(label: impl Into<String>, amount: Decimal, category: LineCategory) -> Self {
        Self {
            label: label.into(),
            amount,
            category,
        }
    }

    /// Negative lines are discounts.
    pub fn is_discount(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Soft conditions that do not stop the computation but that a user
/// should be told about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    BaseBelowMinimumWage { base: Decimal, minimum_wage: Decimal },
    WorkedDaysOutOfRange { worked_days: u32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::BaseBelowMinimumWage { .. } => {
                write!(f, "base cannot be lower than minimum wage")
            }
            Advisory::WorkedDaysOutOfRange { worked_days } => {
                write!(f, "worked days {} is outside 1..=30", worked_days)
            }
        }
    }
}

/// The priced breakdown for one [`CalculationInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutput {
    pub modality: Modality,
    /// Contribution base after applying the auto-base rule.
    pub contribution_base: Decimal,
    /// `contribution_base × worked_days / 30`.
    pub prorated_base: Decimal,
    pub contribution_line_items: Vec<LineItem>,
    pub contribution_subtotal: Decimal,
    pub procedure_line_items: Vec<LineItem>,
    pub procedure_subtotal: Decimal,
    pub grand_total: Decimal,
    pub advisories: Vec<Advisory>,
}

impl CalculationOutput {
    /// All lines, contributions first.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.contribution_line_items
            .iter()
            .chain(self.procedure_line_items.iter())
    }

    pub fn find(&self, category: &LineCategory) -> Option<&LineItem> {
        self.line_items().find(|item| &item.category == category)
    }
}

/// A named, timestamped snapshot of a [`CalculationInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProfile {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub input: CalculationInput,
}

impl SavedProfile {
    pub fn new(name: impl Into<String>, input: CalculationInput) -> Self {
        Self {
            name: name.into(),
            saved_at: Utc::now(),
            input,
        }
    }
}
