//! Presentation helpers.
//!
//! Amounts are carried at full precision through the engine and only
//! rounded to whole currency units here, when they are turned into text.

use crate::models::{CalculationOutput, LineItem, Modality};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::fmt;

/// Formats an amount as whole pesos with `.` thousands separators,
/// e.g. `$ 1.423.500` or `-$ 50.000`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-$ {}", grouped)
    } else {
        format!("$ {}", grouped)
    }
}

/// Formats a fractional rate as a percentage, e.g. `0.125` as `12.5%`.
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * dec!(100)).normalize())
}

/// Plain-text breakdown suitable for sharing with a client.
pub struct Summary<'a>(pub &'a CalculationOutput);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self.0;
        let modality = match output.modality {
            Modality::Independent => "Independiente",
            Modality::Dependent => "Dependiente",
        };
        writeln!(f, "Modalidad: {}", modality)?;
        writeln!(f, "IBC: {}", format_currency(output.contribution_base))?;
        if output.prorated_base != output.contribution_base {
            writeln!(f, "IBC proporcional: {}", format_currency(output.prorated_base))?;
        }

        if !output.contribution_line_items.is_empty() {
            writeln!(f, "\nAportes")?;
            write_lines(f, &output.contribution_line_items)?;
            writeln!(f, "Subtotal aportes: {}", format_currency(output.contribution_subtotal))?;
        }
        if !output.procedure_line_items.is_empty() {
            writeln!(f, "\nTrámites y servicios")?;
            write_lines(f, &output.procedure_line_items)?;
            writeln!(f, "Subtotal trámites: {}", format_currency(output.procedure_subtotal))?;
        }

        writeln!(f, "\nTotal: {}", format_currency(output.grand_total))?;
        for advisory in &output.advisories {
            writeln!(f, "Aviso: {}", advisory)?;
        }
        Ok(())
    }
}

/// Renders the [`Summary`] of `output` to a string.
pub fn render_summary(output: &CalculationOutput) -> String {
    Summary(output).to_string()
}

fn write_lines(f: &mut fmt::Formatter<'_>, lines: &[LineItem]) -> fmt::Result {
    for line in lines {
        let marker = if line.is_discount() { " (descuento)" } else { "" };
        writeln!(
            f,
            "  {}{}: {}",
            line.label,
            marker,
            format_currency(line.amount)
        )?;
    }
    Ok(())
}
