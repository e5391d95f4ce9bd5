//! Map typed spreadsheet rows to product, category and brand records

use crate::columns::ProductRow;
use crate::normalize::{parse_decimal, parse_int, pick_first, slugify};
use log::{debug, info};
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// First spreadsheet row holding data (row 1 is the header)
const FIRST_DATA_ROW: usize = 2;

/// A category or brand reference derived from free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxon {
    pub slug: String,
    pub name: String,
}

impl Taxon {
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
        }
    }
}

/// Optional product attributes, stored as a JSON object.
///
/// Field order is the key order in the serialized object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

impl ProductMetadata {
    pub fn from_row(row: &ProductRow) -> Self {
        Self {
            model: row.model.clone(),
            size: row.sizes.clone(),
            color: row.colors.clone(),
            tags: row.tags.clone(),
            images: row.images.clone(),
            discount: row.discount.clone(),
        }
    }

    /// Compact JSON object (`{"model":"X1"}`)
    pub fn to_json(&self) -> String {
        // Only string fields: serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A product ready to be written as one upsert row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub tenant_id: String,
    pub category: Option<Taxon>,
    pub brand: Option<Taxon>,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub base_price: BigDecimal,
    pub cost: Option<BigDecimal>,
    pub stock: i64,
    pub metadata: ProductMetadata,
    pub active: bool,
}

/// Everything one conversion produces, ordered for output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogBatch {
    pub tenant_id: String,
    /// slug -> display name
    pub categories: BTreeMap<String, String>,
    /// slug -> display name
    pub brands: BTreeMap<String, String>,
    pub products: Vec<ProductRecord>,
}

/// Counters describing one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_without_name: usize,
    pub products: usize,
    pub categories: usize,
    pub brands: usize,
    pub sku_collisions: usize,
    pub generated_skus: usize,
}

/// Hands out unique SKUs for one run
#[derive(Debug, Default)]
struct SkuRegistry {
    /// Times each base SKU was requested
    uses: HashMap<String, usize>,
    /// Every SKU handed out so far, suffixed or not
    taken: HashSet<String>,
}

impl SkuRegistry {
    /// Returns the SKU to use and whether it had to be suffixed.
    ///
    /// A taken base gets `-<n>`, with `n` starting at its use count (2 on the
    /// second use) and moving up past suffixes already handed out.
    fn claim(&mut self, base: String) -> (String, bool) {
        let uses = self.uses.entry(base.clone()).or_insert(0);
        *uses += 1;

        if !self.taken.contains(&base) {
            self.taken.insert(base.clone());
            return (base, false);
        }

        let mut n = (*uses).max(2);
        loop {
            let sku = format!("{}-{}", base, n);
            if self.taken.insert(sku.clone()) {
                return (sku, true);
            }
            n += 1;
        }
    }
}

/// Convert rows into a catalog batch for `tenant_id`.
///
/// Rows are numbered from 2 in the order given. Rows without a product name
/// contribute nothing. Category and brand names are last-write-wins per slug.
pub fn map_rows(rows: &[ProductRow], tenant_id: &str) -> (CatalogBatch, ImportSummary) {
    let mut batch = CatalogBatch {
        tenant_id: tenant_id.to_string(),
        ..Default::default()
    };
    let mut summary = ImportSummary {
        rows_read: rows.len(),
        ..Default::default()
    };
    let mut skus = SkuRegistry::default();

    for (offset, row) in rows.iter().enumerate() {
        let row_index = offset + FIRST_DATA_ROW;

        let Some(name) = pick_first([row.product.as_deref()]) else {
            summary.rows_without_name += 1;
            continue;
        };

        let category = category_name(row).map(Taxon::from_name);
        if let Some(taxon) = &category {
            batch
                .categories
                .insert(taxon.slug.clone(), taxon.name.clone());
        }

        let brand = pick_first([row.brand.as_deref()]).map(Taxon::from_name);
        if let Some(taxon) = &brand {
            batch.brands.insert(taxon.slug.clone(), taxon.name.clone());
        }

        let base_sku = pick_first([
            row.sku.as_deref(),
            row.product_code.as_deref(),
            row.internal_code.as_deref(),
            row.price_id.as_deref(),
            row.id.as_deref(),
        ])
        .unwrap_or_else(|| {
            summary.generated_skus += 1;
            format!("row-{}", row_index)
        });
        let (sku, collided) = skus.claim(base_sku);
        if collided {
            debug!("Row {}: duplicate SKU renamed to '{}'", row_index, sku);
            summary.sku_collisions += 1;
        }

        let barcode = pick_first([row.barcode.as_deref(), row.product_code.as_deref()]);

        let cost = row.cost.as_deref().and_then(parse_decimal);
        let base_price = row
            .price
            .as_deref()
            .and_then(parse_decimal)
            .or_else(|| cost.clone())
            .unwrap_or_else(BigDecimal::zero);
        let stock = row.store_stock.as_deref().and_then(parse_int).unwrap_or(0);

        let description = pick_first([
            row.description.as_deref(),
            row.short_description.as_deref(),
            row.model.as_deref(),
        ]);

        batch.products.push(ProductRecord {
            tenant_id: tenant_id.to_string(),
            category,
            brand,
            name,
            description,
            sku,
            barcode,
            base_price,
            cost,
            stock,
            metadata: ProductMetadata::from_row(row),
            active: true,
        });
    }

    summary.products = batch.products.len();
    summary.categories = batch.categories.len();
    summary.brands = batch.brands.len();
    info!(
        "Mapped {} products, {} categories, {} brands from {} rows ({} without name)",
        summary.products,
        summary.categories,
        summary.brands,
        summary.rows_read,
        summary.rows_without_name
    );

    (batch, summary)
}

/// Primary category, else the last segment of the category path
fn category_name(row: &ProductRow) -> Option<String> {
    let from_path = row
        .category_path
        .as_deref()
        .and_then(|path| path.rsplit('/').next());
    pick_first([row.primary_category.as_deref(), from_path])
}
