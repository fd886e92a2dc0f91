//! Sales report compilation
//!
//! Turns the line items of a finished build-report dialog into priced rows
//! and grand totals. Rows keep insertion order and duplicate codes stay
//! separate rows.

pub mod format;
mod render;

pub use render::ReportRenderer;

use crate::catalog::{CatalogError, ProductCatalog};
use crate::state_machine::state::SaleLineItem;
use chrono::NaiveDate;
use format::{escape_html, format_amount, format_points};
use std::fmt::Write;
use thiserror::Error;

/// Date format used in report headers
pub const REPORT_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Product {code} is no longer in the catalog")]
    UnresolvedProduct { code: String },
    #[error("Catalog lookup failed: {0}")]
    Catalog(CatalogError),
}

impl From<CatalogError> for CompileError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProductNotFound(code) => CompileError::UnresolvedProduct { code },
            other => CompileError::Catalog(other),
        }
    }
}

/// One priced line of a report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub code: String,
    /// Both localized names, `ru / en`
    pub display_name: String,
    pub quantity: u32,
    /// Internal price of one unit
    pub unit_price: f64,
    /// Points of one unit times quantity
    pub total_points: f64,
}

impl ReportRow {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// A fully aggregated report ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledReport {
    pub salesperson_name: String,
    pub report_date: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub grand_total_sum: f64,
    pub grand_total_points: f64,
}

/// Resolve every line item against the catalog, in order.
///
/// Quantities are trusted to be valid. A code that no longer resolves fails
/// the whole report.
pub fn compile(
    catalog: &impl ProductCatalog,
    salesperson_name: &str,
    report_date: NaiveDate,
    line_items: &[SaleLineItem],
) -> Result<CompiledReport, CompileError> {
    let mut rows = Vec::with_capacity(line_items.len());
    let mut grand_total_sum = 0.0;
    let mut grand_total_points = 0.0;

    for item in line_items {
        let product = catalog.get_product(&item.product_code)?;
        let quantity = u32::from(item.quantity.get());
        let row = ReportRow {
            code: item.product_code.clone(),
            display_name: product.display_name(),
            quantity,
            unit_price: product.internal_price,
            total_points: product.points * f64::from(quantity),
        };
        grand_total_sum += row.line_total();
        grand_total_points += row.total_points;
        rows.push(row);
    }

    Ok(CompiledReport {
        salesperson_name: salesperson_name.to_string(),
        report_date,
        rows,
        grand_total_sum,
        grand_total_points,
    })
}

impl CompiledReport {
    pub fn formatted_date(&self) -> String {
        self.report_date.format(REPORT_DATE_FORMAT).to_string()
    }

    /// HTML text summary sent as the image caption
    pub fn text_summary(&self) -> String {
        let mut text = format!(
            "Sotuvchi: <b>{}</b>\nSana: {}\n<b>Hisob-kitob ICHKI NARXDA amalga oshirildi!</b>\n\n",
            escape_html(&self.salesperson_name),
            self.formatted_date()
        );
        for row in &self.rows {
            let _ = writeln!(
                text,
                "🔹 ({}) {}\n   {} dona x {} = {} so'm ({} ball)",
                escape_html(&row.code),
                escape_html(&row.display_name),
                row.quantity,
                format_amount(row.unit_price),
                format_amount(row.line_total()),
                format_points(row.total_points)
            );
        }
        text.push_str("\n------------------------------------\n");
        let _ = write!(
            text,
            "📈 <b>Jami Tushum:</b> {} so'm\n🏆 <b>Jami Ball:</b> {}",
            format_amount(self.grand_total_sum),
            format_points(self.grand_total_points)
        );
        text
    }
}
