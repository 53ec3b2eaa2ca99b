//! WebAssembly module for the Spice ERP status screens
//!
//! Provides client-side computation for:
//! - Live closing balance preview while an adjustment is being typed
//! - Stock status labels
//! - Period labels

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::period::*;
pub use shared::validation::*;

fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

fn into_js(message: String) -> JsValue {
    warn(&message);
    JsValue::from_str(&message)
}

fn parse_figure(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|_| format!("{} is not a number: {:?}", field, value))
}

// ============================================================================
// Closing Balance Preview
// ============================================================================

fn closing_preview(
    opening: &str,
    inflow: &str,
    outflow: &str,
    adjustment: &str,
) -> Result<Decimal, String> {
    let opening = parse_figure("opening", opening)?;
    let inflow = parse_figure("inflow", inflow)?;
    let outflow = parse_figure("outflow", outflow)?;

    shared::compute_closing(opening, &[inflow], &[outflow], parse_adjustment_str(adjustment))
        .ok_or_else(|| "Closing balance is out of range".to_string())
}

/// Closing balance for the figures on screen. The adjustment is raw input
/// and falls back to 0 when it isn't numeric.
#[wasm_bindgen]
pub fn preview_closing_balance(
    opening: &str,
    inflow: &str,
    outflow: &str,
    adjustment: &str,
) -> Result<String, JsValue> {
    closing_preview(opening, inflow, outflow, adjustment)
        .map(|closing| closing.to_string())
        .map_err(into_js)
}

#[derive(Serialize)]
struct RowPreview {
    adjustment: Decimal,
    closing_balance: Decimal,
    status: StockStatus,
    label: String,
}

fn row_preview(snapshot_json: &str, adjustment: &str, threshold: &str) -> Result<String, String> {
    let snapshot: PeriodSnapshot = serde_json::from_str(snapshot_json)
        .map_err(|e| format!("Invalid snapshot JSON: {}", e))?;
    let threshold = parse_figure("threshold", threshold)?;

    let adjustment = parse_adjustment_str(adjustment);
    let closing_balance = snapshot
        .closing_with(adjustment)
        .ok_or_else(|| format!("Adjustment {} puts the closing balance out of range", adjustment))?;
    let status = StockStatus::classify(closing_balance, threshold);

    serde_json::to_string(&RowPreview {
        adjustment,
        closing_balance,
        status,
        label: status.to_string(),
    })
    .map_err(|e| e.to_string())
}

/// Recompute one snapshot row as returned by the API with an edited
/// adjustment, without saving it
#[wasm_bindgen]
pub fn preview_snapshot_row(
    snapshot_json: &str,
    adjustment: &str,
    threshold: &str,
) -> Result<String, JsValue> {
    row_preview(snapshot_json, adjustment, threshold).map_err(into_js)
}

// ============================================================================
// Status and Period Labels
// ============================================================================

fn status_label(closing: &str, threshold: &str) -> Result<String, String> {
    let closing = parse_figure("closing", closing)?;
    let threshold = parse_figure("threshold", threshold)?;
    Ok(StockStatus::classify(closing, threshold).to_string())
}

/// "Normal", "Low Stock" or "Out of Stock"
#[wasm_bindgen]
pub fn classify_stock_status(closing: &str, threshold: &str) -> Result<String, JsValue> {
    status_label(closing, threshold).map_err(into_js)
}

fn label_for(date: &str) -> Result<String, String> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Expected a YYYY-MM-DD date, got {:?}", date))?;
    Ok(PeriodKey::from_date(date).to_string())
}

/// Period label of a date, e.g. `2024-01-15` -> `Jan-2024`
#[wasm_bindgen]
pub fn period_label_for(date: &str) -> Result<String, JsValue> {
    label_for(date).map_err(into_js)
}

/// Period label of today in the browser's local time
#[wasm_bindgen]
pub fn current_period_label() -> String {
    let now = js_sys::Date::new_0();
    let year = now.get_full_year() as i32;
    // JS months are 0-based
    let month = now.get_month() + 1;

    match PeriodKey::new(year, month) {
        Some(period) => period.to_string(),
        None => {
            warn("Browser clock returned an invalid month");
            String::new()
        }
    }
}
