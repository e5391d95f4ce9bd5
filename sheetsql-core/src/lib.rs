//! sheetsql-core: turn product spreadsheets into catalog upsert SQL
//!
//! An XLSX sheet of products is read without a spreadsheet library, each row is
//! mapped to a product plus its category and brand, and the result is written
//! as one conflict-safe PostgreSQL script.

pub mod columns;
pub mod config;
pub mod error;
pub mod mapper;
pub mod normalize;
pub mod reader;
pub mod writer;

use std::path::Path;

pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use mapper::{CatalogBatch, ImportSummary, ProductRecord};
pub use reader::SheetTable;

/// SQL script and counters from one conversion
#[derive(Debug, Clone)]
pub struct ImportOutput {
    pub sql: String,
    pub summary: ImportSummary,
}

/// Main importer interface
pub struct SheetImporter {
    config: ImportConfig,
}

impl SheetImporter {
    /// Create an importer with default configuration
    pub fn new() -> Self {
        Self::with_config(ImportConfig::default())
    }

    /// Create an importer with custom configuration
    pub fn with_config(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Convert the configured sheet of an XLSX file for `tenant_id`
    pub fn import_file<P: AsRef<Path>>(&self, path: P, tenant_id: &str) -> Result<ImportOutput> {
        let table = reader::read_sheet_table(path, self.config.sheet_index)?;
        Ok(self.import_table(&table, tenant_id))
    }

    /// Convert an XLSX archive held in memory
    pub fn import_bytes(&self, bytes: &[u8], tenant_id: &str) -> Result<ImportOutput> {
        let table = reader::read_sheet_table_from_bytes(bytes, self.config.sheet_index)?;
        Ok(self.import_table(&table, tenant_id))
    }

    /// Map an already read table and render the script
    pub fn import_table(&self, table: &SheetTable, tenant_id: &str) -> ImportOutput {
        let rows = columns::rows_from_table(table);
        let (batch, summary) = mapper::map_rows(&rows, tenant_id);
        let sql = writer::render_script(&batch, &self.config.script_options());
        ImportOutput { sql, summary }
    }
}

impl Default for SheetImporter {
    fn default() -> Self {
        Self::new()
    }
}
