use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        aggregate::{BtmReport, Outcome, ValuationReport},
        bill::PeriodBillRecord,
        period::month_abbreviation,
    },
    quantity::{Zero, currency::Dollars},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn failed_cell() -> Cell {
    Cell::new("failed").fg(Color::Red).set_alignment(CellAlignment::Right)
}

fn savings_cell(savings: Dollars) -> Cell {
    Cell::new(savings)
        .set_alignment(CellAlignment::Right)
        .fg(if savings >= Dollars::ONE_CENT { Color::Green } else { Color::DarkYellow })
}

fn bill_cells(outcome: Option<&Outcome<PeriodBillRecord>>) -> [Cell; 3] {
    match outcome {
        Some(Ok(record)) => [
            Cell::new(record.without_storage.total())
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(record.with_storage.total()).set_alignment(CellAlignment::Right),
            savings_cell(record.savings()),
        ],
        Some(Err(_)) | None => [failed_cell(), failed_cell(), failed_cell()],
    }
}

pub fn build_btm_table(report: &BtmReport) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Month",
        "Without (monthly)",
        "With (monthly)",
        "Savings (monthly)",
        "Without (daily)",
        "With (daily)",
        "Savings (daily)",
    ]);
    for month in report.monthly.months() {
        let mut row = vec![Cell::new(month_abbreviation(month))];
        row.extend(bill_cells(report.monthly.get(month)));
        row.extend(bill_cells(report.daily.get(month)));
        table.add_row(row);
    }
    table
}

/// Difference between the best and the worst successful scenario of the month.
pub fn spread(report: &ValuationReport, month: u32) -> Option<Dollars> {
    let revenues: Vec<Dollars> = report
        .scenarios
        .values()
        .filter_map(|series| series.get(month)?.as_ref().ok())
        .map(|revenue| revenue.total())
        .collect();
    let max = revenues.iter().copied().max()?;
    let min = revenues.iter().copied().min()?;
    Some(max - min)
}

pub fn build_valuation_table(report: &ValuationReport) -> Table {
    let mut table = new_table();
    let mut header = vec![Cell::new("Month")];
    header.extend(report.scenarios.keys().map(|scenario| Cell::new(scenario.to_string())));
    header.push(Cell::new("Spread"));
    table.set_header(header);

    for month in report.months() {
        let mut row = vec![Cell::new(month_abbreviation(month))];
        row.extend(report.scenarios.values().map(|series| match series.get(month) {
            Some(Ok(revenue)) => Cell::new(revenue.total())
                .set_alignment(CellAlignment::Right)
                .fg(if revenue.total() > Dollars::ZERO { Color::Green } else { Color::Red }),
            Some(Err(_)) | None => failed_cell(),
        }));
        row.push(match spread(report, month) {
            Some(spread) => {
                Cell::new(spread).set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim)
            }
            None => Cell::new("n/a").add_attribute(Attribute::Dim),
        });
        table.add_row(row);
    }

    let mut total_row = vec![Cell::new("Total").add_attribute(Attribute::Bold)];
    total_row.extend(report.scenarios.values().map(|series| {
        if series.n_failures() == 0 {
            let total: Dollars = series
                .iter()
                .filter_map(|(_, outcome)| outcome.as_ref().ok())
                .map(|revenue| revenue.total())
                .sum();
            Cell::new(total).set_alignment(CellAlignment::Right).add_attribute(Attribute::Bold)
        } else {
            Cell::new(format!("{} failed", series.n_failures())).fg(Color::Red)
        }
    }));
    table.add_row(total_row);
    table
}
