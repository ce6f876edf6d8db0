use super::ui;
use crate::app::{App, StartupReport};
use crate::core::allocation::{AllocationReport, build_report};
use crate::core::portfolio::{DataSource, PortfolioState};
use crate::refresh::RefreshOutcome;
use anyhow::Result;
use comfy_table::Cell;

/// Renders the holdings table with values in the base currency.
pub fn assets_table(state: &PortfolioState) -> String {
    let base = state.base_currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Value ({base})")),
        ui::header_cell("Weight (%)"),
    ]);

    for asset in state.current_assets.iter() {
        let weight = asset
            .value_in_base
            .filter(|_| state.total_assets > 0.0)
            .map(|v| v / state.total_assets * 100.0);
        table.add_row(vec![
            Cell::new(&asset.name),
            ui::number_cell(format!("{:.2}", asset.quantity)),
            ui::number_cell(format!("{:.2}{}", asset.unit_price, asset.currency)),
            ui::format_optional_cell(asset.value_in_base, |v| format!("{v:.2}")),
            ui::format_optional_cell(weight, |w| format!("{w:.2}%")),
        ]);
    }

    table.to_string()
}

/// Renders target against current weight for every allocation target.
pub fn allocation_table(report: &AllocationReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Target"),
        ui::header_cell("Target (%)"),
        ui::header_cell("Current (%)"),
        ui::header_cell("Drift (pp)"),
    ]);

    for line in &report.lines {
        table.add_row(vec![
            Cell::new(&line.id),
            ui::number_cell(format!("{:.2}", line.target_weight * 100.0)),
            ui::number_cell(format!("{:.2}", line.current_weight * 100.0)),
            ui::drift_cell(line.drift * 100.0),
        ]);
    }

    let mut output = table.to_string();
    if !report.weights_balanced {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Target weights add up to {:.2}%, not 100%",
                    report.weight_sum * 100.0
                ),
                ui::StyleType::Error
            )
        ));
    }
    if report.unallocated_value > 0.0 {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("Unallocated value: {:.2}", report.unallocated_value),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

/// One line describing where the portfolio came from.
pub fn sync_line(state: &PortfolioState) -> String {
    let source = match state.sync.data_source {
        DataSource::Local => "local",
        DataSource::Cloud => "cloud",
    };
    let last = state
        .sync
        .last_sync_time
        .map_or("never".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let user = state
        .current_user()
        .map_or("not signed in".to_string(), |u| u.email.clone());
    format!("Source: {source} | Last sync: {last} | User: {user}")
}

pub fn rate_line(state: &PortfolioState) -> String {
    match &state.exchange_rate {
        Some(rate) => format!(
            "Exchange rate {}: {:.4} (fetched {})",
            rate.pair,
            rate.rate,
            rate.fetched_at.format("%H:%M:%S UTC")
        ),
        None => ui::style_text("Exchange rate: unavailable", ui::StyleType::Error),
    }
}

/// Allocation report computed from the same snapshot that is rendered.
pub fn report_for(state: &PortfolioState) -> AllocationReport {
    build_report(
        &state.current_assets,
        &state.target_portfolio,
        state.total_assets,
    )
}

pub fn render(state: &PortfolioState, report: &AllocationReport) -> String {
    let mut output = format!(
        "{}\n\n",
        ui::style_text("Portfolio", ui::StyleType::Title)
    );
    output.push_str(&assets_table(state));
    output.push_str(&format!(
        "\n\nTotal Value ({}): {}\n",
        ui::style_text(&state.base_currency.to_string(), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", state.total_assets), ui::StyleType::TotalValue)
    ));

    if !report.lines.is_empty() {
        output.push_str(&format!(
            "\n{}\n\n",
            ui::style_text("Allocation", ui::StyleType::Title)
        ));
        output.push_str(&allocation_table(report));
        output.push('\n');
    }

    output.push_str(&format!("\n{}\n{}", rate_line(state), sync_line(state)));
    output
}

pub async fn run(app: &App, startup: &StartupReport) -> Result<()> {
    let state = app.snapshot();
    let report = report_for(&state);

    if let Some(RefreshOutcome::Skipped { retry_in }) = &startup.rate {
        tracing::debug!("Rate refresh skipped, retry in {retry_in:?}");
    }
    for warning in &startup.warnings {
        eprintln!("{}", ui::style_text(warning, ui::StyleType::Error));
    }

    println!("{}", render(&state, &report));
    Ok(())
}
