//! PostgreSQL upsert script for categories, brands and products

use crate::mapper::{CatalogBatch, ProductRecord, Taxon};
use std::collections::BTreeMap;

const HEADER_COMMENT: &str = "-- Generated from XLSX by sheetsql";

/// Columns updated when a product with the same (tenant_id, sku) exists
const PRODUCT_UPDATE_COLUMNS: [&str; 10] = [
    "category_id",
    "brand_id",
    "name",
    "description",
    "barcode",
    "base_price",
    "cost",
    "stock",
    "metadata",
    "active",
];

/// Output options for [`render_script`]
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Start the script with a comment line naming the generator
    pub header_comment: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            header_comment: true,
        }
    }
}

/// Quote a SQL string literal; `None` becomes `NULL`
pub fn sql_quote(value: Option<&str>) -> String {
    match value {
        Some(text) => format!("'{}'", text.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

/// Render the whole batch as one `BEGIN; ... COMMIT;` script.
///
/// Sections with nothing to insert are left out, so an empty batch yields
/// just the transaction wrapper.
pub fn render_script(batch: &CatalogBatch, options: &ScriptOptions) -> String {
    let mut lines: Vec<String> = Vec::new();
    if options.header_comment {
        lines.push(HEADER_COMMENT.to_string());
    }
    lines.push("BEGIN;".to_string());
    lines.push(String::new());

    push_taxon_section(&mut lines, "Categories", "categories", &batch.tenant_id, &batch.categories);
    push_taxon_section(&mut lines, "Brands", "brands", &batch.tenant_id, &batch.brands);

    if !batch.products.is_empty() {
        lines.push("-- Products".to_string());
        lines.push(
            "INSERT INTO products (tenant_id, category_id, brand_id, name, description, sku, \
             barcode, base_price, cost, stock, metadata, active)"
                .to_string(),
        );
        lines.push("VALUES".to_string());
        lines.push(
            batch
                .products
                .iter()
                .map(product_values)
                .collect::<Vec<_>>()
                .join(",\n"),
        );
        lines.push("ON CONFLICT (tenant_id, sku) DO UPDATE SET".to_string());
        for column in PRODUCT_UPDATE_COLUMNS {
            lines.push(format!("  {column} = EXCLUDED.{column},"));
        }
        lines.push("  updated_at = NOW();".to_string());
        lines.push(String::new());
    }

    lines.push("COMMIT;".to_string());
    lines.push(String::new());
    lines.join("\n")
}

fn push_taxon_section(
    lines: &mut Vec<String>,
    title: &str,
    table: &str,
    tenant_id: &str,
    entries: &BTreeMap<String, String>,
) {
    if entries.is_empty() {
        return;
    }

    let tenant = sql_quote(Some(tenant_id));
    lines.push(format!("-- {}", title));
    lines.push(format!("INSERT INTO {} (tenant_id, name, slug)", table));
    lines.push("VALUES".to_string());
    // BTreeMap iteration is slug order
    lines.push(
        entries
            .iter()
            .map(|(slug, name)| {
                format!(
                    "({}, {}, {})",
                    tenant,
                    sql_quote(Some(name)),
                    sql_quote(Some(slug))
                )
            })
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    lines.push("ON CONFLICT (tenant_id, slug) DO UPDATE SET".to_string());
    lines.push("  name = EXCLUDED.name;".to_string());
    lines.push(String::new());
}

/// Correlated lookup of a category/brand id by tenant and slug
fn taxon_ref(table: &str, tenant_id: &str, taxon: Option<&Taxon>) -> String {
    match taxon {
        Some(taxon) => format!(
            "(SELECT id FROM {} WHERE tenant_id = {} AND slug = {})",
            table,
            sql_quote(Some(tenant_id)),
            sql_quote(Some(&taxon.slug))
        ),
        None => "NULL".to_string(),
    }
}

fn product_values(product: &ProductRecord) -> String {
    let cost = product
        .cost
        .as_ref()
        .map(|c| c.to_plain_string())
        .unwrap_or_else(|| "NULL".to_string());

    format!(
        "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}::jsonb, {})",
        sql_quote(Some(&product.tenant_id)),
        taxon_ref("categories", &product.tenant_id, product.category.as_ref()),
        taxon_ref("brands", &product.tenant_id, product.brand.as_ref()),
        sql_quote(Some(&product.name)),
        sql_quote(product.description.as_deref()),
        sql_quote(Some(&product.sku)),
        sql_quote(product.barcode.as_deref()),
        product.base_price.to_plain_string(),
        cost,
        product.stock,
        sql_quote(Some(&product.metadata.to_json())),
        product.active,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ProductMetadata;
    use bigdecimal::{BigDecimal, Zero};
    use std::str::FromStr;

    fn product(sku: &str) -> ProductRecord {
        ProductRecord {
            tenant_id: "t1".into(),
            category: None,
            brand: None,
            name: "Widget".into(),
            description: None,
            sku: sku.into(),
            barcode: None,
            base_price: BigDecimal::zero(),
            cost: None,
            stock: 0,
            metadata: ProductMetadata::default(),
            active: true,
        }
    }

    #[test]
    fn test_sql_quote() {
        assert_eq!(sql_quote(Some("plain")), "'plain'");
        assert_eq!(sql_quote(Some("O'Brien's")), "'O''Brien''s'");
        assert_eq!(sql_quote(Some("")), "''");
        assert_eq!(sql_quote(None), "NULL");
    }

    #[test]
    fn test_empty_batch_is_bare_transaction() {
        let batch = CatalogBatch {
            tenant_id: "t1".into(),
            ..Default::default()
        };
        let no_comment = ScriptOptions {
            header_comment: false,
        };
        assert_eq!(render_script(&batch, &no_comment), "BEGIN;\n\nCOMMIT;\n");

        let script = render_script(&batch, &ScriptOptions::default());
        assert!(script.starts_with("-- "));
        assert!(!script.contains("INSERT"));
    }

    #[test]
    fn test_taxon_sections_sorted_by_slug() {
        let mut batch = CatalogBatch {
            tenant_id: "t1".into(),
            ..Default::default()
        };
        batch.categories.insert("zapatos".into(), "Zapatos".into());
        batch.categories.insert("abrigos".into(), "Abrigos".into());
        batch.brands.insert("d-la".into(), "D'la".into());

        let script = render_script(&batch, &ScriptOptions::default());
        assert!(script.contains(
            "INSERT INTO categories (tenant_id, name, slug)\nVALUES\n\
             ('t1', 'Abrigos', 'abrigos'),\n('t1', 'Zapatos', 'zapatos')\n\
             ON CONFLICT (tenant_id, slug) DO UPDATE SET\n  name = EXCLUDED.name;\n"
        ));
        assert!(script.contains("('t1', 'D''la', 'd-la')"));
        assert!(!script.contains("INSERT INTO products"));

        let categories_at = script.find("-- Categories").unwrap();
        let brands_at = script.find("-- Brands").unwrap();
        assert!(categories_at < brands_at);
    }

    #[test]
    fn test_product_row_rendering() {
        let mut record = product("W1");
        record.category = Some(Taxon::from_name("Tools"));
        record.description = Some("It's big".into());
        record.base_price = BigDecimal::from_str("1234.50").unwrap();
        record.cost = Some(BigDecimal::from_str("1000").unwrap());
        record.stock = -2;
        record.metadata.model = Some("M\"1".into());

        let batch = CatalogBatch {
            tenant_id: "t1".into(),
            products: vec![record],
            ..Default::default()
        };
        let script = render_script(&batch, &ScriptOptions::default());

        assert!(script.contains(
            "('t1', (SELECT id FROM categories WHERE tenant_id = 't1' AND slug = 'tools'), NULL, \
             'Widget', 'It''s big', 'W1', NULL, 1234.50, 1000, -2, '{\"model\":\"M\\\"1\"}'::jsonb, true)"
        ));
        assert!(script.contains("ON CONFLICT (tenant_id, sku) DO UPDATE SET\n  category_id = EXCLUDED.category_id,"));
        assert!(script.contains("  active = EXCLUDED.active,\n  updated_at = NOW();\n\nCOMMIT;\n"));
    }

    #[test]
    fn test_long_decimals_written_in_full() {
        let mut record = product("BIG");
        record.base_price = BigDecimal::from_str("79228162514264337593543950336").unwrap();
        record.cost = Some(BigDecimal::from_str("0.123456789012345678901234567890123").unwrap());

        let batch = CatalogBatch {
            tenant_id: "t1".into(),
            products: vec![record],
            ..Default::default()
        };
        let script = render_script(&batch, &ScriptOptions::default());
        assert!(script.contains(
            "'BIG', NULL, 79228162514264337593543950336, 0.123456789012345678901234567890123, 0,"
        ));
    }

    #[test]
    fn test_products_joined_with_commas() {
        let batch = CatalogBatch {
            tenant_id: "t1".into(),
            products: vec![product("A"), product("B")],
            ..Default::default()
        };
        let script = render_script(&batch, &ScriptOptions::default());
        assert!(script.contains("'{}'::jsonb, true),\n('t1', NULL, NULL, 'Widget', NULL, 'B'"));
    }
}
