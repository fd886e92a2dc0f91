//! Catalog schema and types

use indexmap::IndexMap;
use serde::Deserialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS products (
    kod TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    name_ru TEXT NOT NULL,
    name_en TEXT NOT NULL,
    internal_price REAL NOT NULL,
    external_price REAL NOT NULL,
    points REAL NOT NULL,
    volume REAL
);
";

/// A catalog entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub code: String,
    pub category: String,
    pub name: LocalizedName,
    /// Discounted price used to value reports
    pub internal_price: f64,
    /// Shelf price, informational only
    pub external_price: f64,
    pub points: f64,
    /// Volume in ml, not every product has one
    pub volume: Option<f64>,
}

impl ProductRecord {
    /// Both localized names joined for report rows
    pub fn display_name(&self) -> String {
        format!("{} / {}", self.name.ru, self.name.en)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalizedName {
    pub ru: String,
    pub en: String,
}

// ============================================================================
// Catalog source file
// ============================================================================

/// Top-level shape of the catalog source file
#[derive(Debug, Deserialize)]
pub struct CatalogSource {
    /// Product entries grouped by category, in file order
    #[serde(rename = "mahsulotlar")]
    pub categories: IndexMap<String, Vec<SourceEntry>>,
}

/// One product entry as written in the source file
#[derive(Debug, Deserialize)]
pub struct SourceEntry {
    #[serde(rename = "kod")]
    pub code: String,
    #[serde(rename = "nom")]
    pub name: LocalizedName,
    #[serde(rename = "chegirma_narx")]
    pub internal_price: f64,
    #[serde(rename = "narx")]
    pub external_price: f64,
    #[serde(rename = "ball")]
    pub points: f64,
    #[serde(rename = "hajm", default)]
    pub volume: Option<f64>,
}

impl CatalogSource {
    /// Flatten the category grouping into records
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.categories
            .into_iter()
            .flat_map(|(category, entries)| {
                entries.into_iter().map(move |entry| ProductRecord {
                    code: entry.code,
                    category: category.clone(),
                    name: entry.name,
                    internal_price: entry.internal_price,
                    external_price: entry.external_price,
                    points: entry.points,
                    volume: entry.volume,
                })
            })
            .collect()
    }
}
