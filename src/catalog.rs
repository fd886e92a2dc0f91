//! Catalog store
//!
//! Product records keyed by code, synced once at startup from the catalog
//! source file and read-only while sessions run.

mod schema;

pub use schema::*;

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Cannot read catalog source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed catalog source: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog connection lock poisoned")]
    LockPoisoned,
}

impl CatalogError {
    /// A lookup miss is a normal outcome, everything else is a store failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::ProductNotFound(_))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read access to product records
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by code. A miss is `CatalogError::ProductNotFound`.
    fn get_product(&self, code: &str) -> CatalogResult<ProductRecord>;
}

impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    fn get_product(&self, code: &str) -> CatalogResult<ProductRecord> {
        (**self).get_product(code)
    }
}

/// Thread-safe SQLite-backed catalog handle
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Open or create the catalog database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn conn(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    fn init_schema(&self) -> CatalogResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Parse the catalog source file and upsert every entry.
    ///
    /// Returns the number of records written.
    pub fn sync_from_file<P: AsRef<Path>>(&self, path: P) -> CatalogResult<usize> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let source: CatalogSource = serde_json::from_str(&raw)?;
        let count = self.load(&source.into_records())?;
        tracing::info!(
            path = %path.as_ref().display(),
            count,
            "Catalog synced from source file"
        );
        Ok(count)
    }

    /// Upsert records by code. An existing code is replaced whole.
    pub fn load(&self, records: &[ProductRecord]) -> CatalogResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO products
                 (kod, category, name_ru, name_en, internal_price, external_price, points, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.code,
                    record.category,
                    record.name.ru,
                    record.name.en,
                    record.internal_price,
                    record.external_price,
                    record.points,
                    record.volume,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Number of products currently stored
    pub fn count(&self) -> CatalogResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl ProductCatalog for Catalog {
    fn get_product(&self, code: &str) -> CatalogResult<ProductRecord> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT kod, category, name_ru, name_en, internal_price, external_price, points, volume
             FROM products WHERE kod = ?1",
        )?;

        stmt.query_row(params![code], |row| {
            Ok(ProductRecord {
                code: row.get(0)?,
                category: row.get(1)?,
                name: LocalizedName {
                    ru: row.get(2)?,
                    en: row.get(3)?,
                },
                internal_price: row.get(4)?,
                external_price: row.get(5)?,
                points: row.get(6)?,
                volume: row.get(7)?,
            })
        })
        .optional()?
        .ok_or_else(|| CatalogError::ProductNotFound(code.to_string()))
    }
}
