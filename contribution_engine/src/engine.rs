//! Contribution computation engine.
//!
//! The `engine` module turns a [`CalculationInput`] into a
//! [`CalculationOutput`].  [`compute`] is a pure function: it reads the
//! input and the two policy tables, never mutates shared state and
//! either returns a complete breakdown or an [`EngineError`].  All
//! arithmetic happens on [`Decimal`] so subtotals equal the sum of
//! their lines exactly; rounding is left to [`crate::format`].

use crate::error::{EngineError, EngineResult};
use crate::format::format_rate;
use crate::models::{
    Advisory, CalculationInput, CalculationOutput, LineCategory, LineItem, Modality,
};
use crate::rates::{ContributionRateTable, ProcedureCostTable};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Days in a contribution month.
pub const DAYS_PER_MONTH: u32 = 30;

/// Computes the priced breakdown for `input`.
///
/// Fails with [`EngineError::InvalidArgument`] when either table is
/// malformed or the input breaks the caller contract (risk class out of
/// range while risk is included, unknown procedure key, unsupported
/// independent family compensation rate, empty additional item
/// description).  Nothing is returned on failure.
pub fn compute(
    input: &CalculationInput,
    rates: &ContributionRateTable,
    costs: &ProcedureCostTable,
) -> EngineResult<CalculationOutput> {
    rates.validate()?;
    costs.validate()?;
    check_input(input, rates, costs)?;

    let contribution_base = resolve_contribution_base(input, rates)?;
    let prorated_base = prorate(contribution_base, input.worked_days)?;

    let mut advisories = Vec::new();
    if contribution_base < rates.minimum_wage {
        advisories.push(Advisory::BaseBelowMinimumWage {
            base: contribution_base,
            minimum_wage: rates.minimum_wage,
        });
    }
    if input.worked_days == 0 || input.worked_days > DAYS_PER_MONTH {
        advisories.push(Advisory::WorkedDaysOutOfRange {
            worked_days: input.worked_days,
        });
    }
    for advisory in &advisories {
        warn!(%advisory, "contribution input advisory");
    }

    let contribution_line_items = contribution_lines(input, rates, prorated_base)?;
    let procedure_line_items = procedure_lines(input, costs);

    let contribution_subtotal = subtotal(&contribution_line_items)?;
    let procedure_subtotal = subtotal(&procedure_line_items)?;
    let grand_total = contribution_subtotal
        .checked_add(procedure_subtotal)
        .ok_or_else(overflow)?;

    debug!(
        modality = ?input.modality,
        %prorated_base,
        %contribution_subtotal,
        %procedure_subtotal,
        %grand_total,
        "computed contribution breakdown"
    );

    Ok(CalculationOutput {
        modality: input.modality,
        contribution_base,
        prorated_base,
        contribution_line_items,
        contribution_subtotal,
        procedure_line_items,
        procedure_subtotal,
        grand_total,
        advisories,
    })
}

/// Computes a batch of inputs in parallel, preserving their order.
///
/// The batch is all-or-nothing: if any input fails, no outputs are
/// returned and the error of the first failing input, in input order,
/// is reported.
pub fn compute_batch(
    inputs: &[CalculationInput],
    rates: &ContributionRateTable,
    costs: &ProcedureCostTable,
) -> EngineResult<Vec<CalculationOutput>> {
    let results: Vec<EngineResult<CalculationOutput>> = inputs
        .par_iter()
        .map(|input| compute(input, rates, costs))
        .collect();
    results.into_iter().collect()
}

/// Returns the contribution base the engine prices against.
///
/// Independent contributors with `auto_base` get
/// `max(monthly_income × independent_income_ratio, minimum_wage)`;
/// everyone else gets `contribution_base` as given.
pub fn resolve_contribution_base(
    input: &CalculationInput,
    rates: &ContributionRateTable,
) -> EngineResult<Decimal> {
    match input.modality {
        Modality::Independent if input.auto_base => {
            let derived = input
                .monthly_income
                .checked_mul(rates.independent_income_ratio)
                .ok_or_else(overflow)?;
            Ok(derived.max(rates.minimum_wage))
        }
        _ => Ok(input.contribution_base),
    }
}

/// Prorates a monthly base over the days worked.  No clamping: values
/// outside 1..=30 scale linearly.
pub fn prorate(base: Decimal, worked_days: u32) -> EngineResult<Decimal> {
    base.checked_mul(Decimal::from(worked_days))
        .and_then(|scaled| scaled.checked_div(Decimal::from(DAYS_PER_MONTH)))
        .ok_or_else(overflow)
}

fn subtotal(lines: &[LineItem]) -> EngineResult<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.amount).ok_or_else(overflow)
    })
}

fn overflow() -> EngineError {
    EngineError::invalid("amount overflow")
}

fn check_input(
    input: &CalculationInput,
    rates: &ContributionRateTable,
    costs: &ProcedureCostTable,
) -> EngineResult<()> {
    if input.include_occupational_risk {
        rates.risk_rate(input.occupational_risk_class)?;
    }

    let family = input.family_compensation_rate;
    if family < Decimal::ZERO {
        return Err(EngineError::invalid(format!(
            "family compensation rate {} is negative",
            family
        )));
    }
    if input.modality == Modality::Independent
        && !rates
            .family_compensation
            .independent_options
            .contains(&family)
    {
        return Err(EngineError::invalid(format!(
            "family compensation rate {} is not an independent option",
            family
        )));
    }

    for key in &input.charged_procedures {
        if !costs.contains(key) {
            return Err(EngineError::invalid(format!("unknown procedure '{}'", key)));
        }
    }

    for (i, item) in input.additional_items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(EngineError::invalid(format!(
                "additional item {} has an empty description",
                i
            )));
        }
    }
    Ok(())
}

fn contribution_lines(
    input: &CalculationInput,
    rates: &ContributionRateTable,
    base: Decimal,
) -> EngineResult<Vec<LineItem>> {
    let mut lines = Vec::new();
    let mut push = |label: String, rate: Decimal, category: LineCategory| -> EngineResult<()> {
        let amount = base.checked_mul(rate).ok_or_else(overflow)?;
        // Only strictly positive contributions are shown.
        if amount > Decimal::ZERO {
            lines.push(LineItem::new(label, amount, category));
        }
        Ok(())
    };

    match input.modality {
        Modality::Independent => {
            if input.include_health {
                let rate = rates.health.independent_rate;
                push(labelled("Salud", rate), rate, LineCategory::Health)?;
            }
            if input.include_pension {
                let rate = rates.pension.independent_rate;
                push(labelled("Pensión", rate), rate, LineCategory::Pension)?;
            }
        }
        Modality::Dependent => {
            if input.include_health {
                let employee = rates.health.dependent_employee_rate;
                let employer = rates.health.dependent_employer_rate;
                push(
                    labelled("Salud empleado", employee),
                    employee,
                    LineCategory::HealthEmployee,
                )?;
                push(
                    labelled("Salud empleador", employer),
                    employer,
                    LineCategory::HealthEmployer,
                )?;
            }
            if input.include_pension {
                let rate = rates.pension.dependent_employee_rate + rates.pension.dependent_employer_rate;
                push(labelled("Pensión", rate), rate, LineCategory::Pension)?;
            }
        }
    }

    if input.include_occupational_risk {
        let class = input.occupational_risk_class;
        let rate = rates.risk_rate(class)?;
        push(
            labelled(&format!("ARL clase {}", class), rate),
            rate,
            LineCategory::OccupationalRisk,
        )?;
    }

    if input.family_compensation_rate > Decimal::ZERO {
        let rate = match input.modality {
            Modality::Independent => input.family_compensation_rate,
            Modality::Dependent => rates.family_compensation.dependent_rate,
        };
        push(
            labelled("Caja de compensación", rate),
            rate,
            LineCategory::FamilyCompensation,
        )?;
    }

    Ok(lines)
}

fn procedure_lines(input: &CalculationInput, costs: &ProcedureCostTable) -> Vec<LineItem> {
    let mut lines: Vec<LineItem> = costs
        .procedures
        .iter()
        .filter(|p| input.charged_procedures.contains(&p.key))
        .map(|p| {
            LineItem::new(
                p.label.clone(),
                p.amount,
                LineCategory::Procedure { key: p.key.clone() },
            )
        })
        .collect();

    // Dependent quotes always carry the administration line, even at zero.
    if input.modality == Modality::Dependent {
        lines.push(LineItem::new(
            "Administración",
            input.admin_fee,
            LineCategory::AdminFee,
        ));
    }

    lines.extend(input.additional_items.iter().map(|item| {
        LineItem::new(
            item.description.trim(),
            item.amount,
            LineCategory::Additional,
        )
    }));
    lines
}

fn labelled(name: &str, rate: Decimal) -> String {
    format!("{} ({})", name, format_rate(rate))
}
