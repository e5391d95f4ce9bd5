//! Recognized spreadsheet columns and the typed row built from them

use crate::reader::SheetTable;
use log::{debug, warn};

/// Columns the importer understands, by their normalized header text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Product,
    PrimaryCategory,
    CategoryPath,
    Brand,
    Sku,
    ProductCode,
    InternalCode,
    PriceId,
    Id,
    Barcode,
    Cost,
    Price,
    StoreStock,
    Description,
    ShortDescription,
    Model,
    Sizes,
    Colors,
    Tags,
    Images,
    Discount,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::Product,
        Column::PrimaryCategory,
        Column::CategoryPath,
        Column::Brand,
        Column::Sku,
        Column::ProductCode,
        Column::InternalCode,
        Column::PriceId,
        Column::Id,
        Column::Barcode,
        Column::Cost,
        Column::Price,
        Column::StoreStock,
        Column::Description,
        Column::ShortDescription,
        Column::Model,
        Column::Sizes,
        Column::Colors,
        Column::Tags,
        Column::Images,
        Column::Discount,
    ];

    /// Normalized header text that selects this column
    pub fn header(self) -> &'static str {
        match self {
            Column::Product => "producto",
            Column::PrimaryCategory => "categoria primaria",
            Column::CategoryPath => "ruta categorias",
            Column::Brand => "marca",
            Column::Sku => "sku",
            Column::ProductCode => "codigo producto",
            Column::InternalCode => "codigos interno",
            Column::PriceId => "id precio",
            Column::Id => "id",
            Column::Barcode => "codigos de barras",
            Column::Cost => "costo",
            Column::Price => "precio",
            Column::StoreStock => "stock:tienda",
            Column::Description => "descripcion",
            Column::ShortDescription => "descripcion corta",
            Column::Model => "modelo",
            Column::Sizes => "tamanos",
            Column::Colors => "colores",
            Column::Tags => "etiquetas",
            Column::Images => "imagenes ailoo",
            Column::Discount => "descuento",
        }
    }

    /// Look up a column by an already normalized header
    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

/// Column lookup for each header position, resolved once per sheet
#[derive(Debug, Clone)]
pub struct HeaderMap {
    columns: Vec<Option<Column>>,
}

impl HeaderMap {
    pub fn new(headers: &[String]) -> Self {
        let columns = headers.iter().map(|h| Column::from_header(h)).collect();
        Self { columns }
    }

    /// Recognized columns present in the sheet
    pub fn recognized(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().flatten().copied()
    }

    pub fn contains(&self, column: Column) -> bool {
        self.recognized().any(|c| c == column)
    }
}

/// One data row with every recognized column as an optional value.
///
/// Values are trimmed; blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRow {
    pub product: Option<String>,
    pub primary_category: Option<String>,
    pub category_path: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub product_code: Option<String>,
    pub internal_code: Option<String>,
    pub price_id: Option<String>,
    pub id: Option<String>,
    pub barcode: Option<String>,
    pub cost: Option<String>,
    pub price: Option<String>,
    pub store_stock: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub model: Option<String>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub tags: Option<String>,
    pub images: Option<String>,
    pub discount: Option<String>,
}

impl ProductRow {
    /// Build a typed row from the cells of one data row.
    ///
    /// When a header appears twice the right-most cell wins, even if blank.
    pub fn from_cells(map: &HeaderMap, cells: &[String]) -> Self {
        let mut row = ProductRow::default();
        for (idx, column) in map.columns.iter().enumerate() {
            if let Some(column) = column {
                let value = cells
                    .get(idx)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                *row.field_mut(*column) = value;
            }
        }
        row
    }

    fn field_mut(&mut self, column: Column) -> &mut Option<String> {
        match column {
            Column::Product => &mut self.product,
            Column::PrimaryCategory => &mut self.primary_category,
            Column::CategoryPath => &mut self.category_path,
            Column::Brand => &mut self.brand,
            Column::Sku => &mut self.sku,
            Column::ProductCode => &mut self.product_code,
            Column::InternalCode => &mut self.internal_code,
            Column::PriceId => &mut self.price_id,
            Column::Id => &mut self.id,
            Column::Barcode => &mut self.barcode,
            Column::Cost => &mut self.cost,
            Column::Price => &mut self.price,
            Column::StoreStock => &mut self.store_stock,
            Column::Description => &mut self.description,
            Column::ShortDescription => &mut self.short_description,
            Column::Model => &mut self.model,
            Column::Sizes => &mut self.sizes,
            Column::Colors => &mut self.colors,
            Column::Tags => &mut self.tags,
            Column::Images => &mut self.images,
            Column::Discount => &mut self.discount,
        }
    }
}

/// Typed rows for every data row of the table, in order
pub fn rows_from_table(table: &SheetTable) -> Vec<ProductRow> {
    let map = HeaderMap::new(&table.headers);
    debug!("Recognized {} of {} columns", map.recognized().count(), table.headers.len());
    if !table.rows.is_empty() && !map.contains(Column::Product) {
        warn!(
            "No '{}' column found; all {} data rows will be skipped",
            Column::Product.header(),
            table.rows.len()
        );
    }

    table
        .rows
        .iter()
        .map(|cells| ProductRow::from_cells(&map, cells))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_header_round_trip_for_every_column() {
        for column in Column::ALL {
            assert_eq!(Column::from_header(column.header()), Some(column));
        }
        assert_eq!(Column::from_header("Producto"), None);
        assert_eq!(Column::from_header("unknown"), None);
    }

    #[test]
    fn test_row_from_cells() {
        let headers = strings(&["producto", "otra cosa", "precio", "stock:tienda"]);
        let map = HeaderMap::new(&headers);
        assert!(map.contains(Column::Price));
        assert!(!map.contains(Column::Brand));

        let row = ProductRow::from_cells(&map, &strings(&["Widget", "x", " 19.99 ", ""]));
        assert_eq!(row.product.as_deref(), Some("Widget"));
        assert_eq!(row.price.as_deref(), Some("19.99"));
        assert_eq!(row.store_stock, None);
        assert_eq!(row.brand, None);
    }

    #[test]
    fn test_duplicate_header_rightmost_wins() {
        let headers = strings(&["sku", "producto", "sku"]);
        let map = HeaderMap::new(&headers);

        let row = ProductRow::from_cells(&map, &strings(&["A1", "Widget", "B2"]));
        assert_eq!(row.sku.as_deref(), Some("B2"));

        let row = ProductRow::from_cells(&map, &strings(&["A1", "Widget", ""]));
        assert_eq!(row.sku, None);
    }

    #[test]
    fn test_rows_from_table() {
        let table = SheetTable {
            headers: strings(&["producto", "marca"]),
            rows: vec![strings(&["A", "Acme"]), strings(&["B"])],
        };
        let rows = rows_from_table(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].brand.as_deref(), Some("Acme"));
        assert_eq!(rows[1].product.as_deref(), Some("B"));
        assert_eq!(rows[1].brand, None);
    }

    #[test]
    fn test_rows_without_product_column_are_all_nameless() {
        let table = SheetTable {
            headers: strings(&["nombre", "marca"]),
            rows: vec![strings(&["Widget", "Acme"])],
        };
        let map = HeaderMap::new(&table.headers);
        assert!(!map.contains(Column::Product));
        assert_eq!(map.recognized().collect::<Vec<_>>(), vec![Column::Brand]);

        let rows = rows_from_table(&table);
        assert_eq!(rows[0].product, None);
        assert_eq!(rows[0].brand.as_deref(), Some("Acme"));
    }
}
