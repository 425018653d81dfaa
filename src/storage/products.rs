//! Catalog products as seen by the admin side

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::pagination::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Selling price in kopecks
    pub price: i64,
    /// Purchase cost in kopecks
    pub cost_price: i64,
    pub stock: i64,
    pub image_file_id: Option<String>,
    pub is_active: bool,
}

impl Product {
    pub fn has_image(&self) -> bool {
        self.image_file_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub cost_price: i64,
    pub stock: i64,
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, cost_price, stock, image_file_id, is_active";

fn product_from_row(row: &rusqlite::Row<'_>) -> Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        cost_price: row.get(4)?,
        stock: row.get(5)?,
        image_file_id: row.get(6)?,
        is_active: row.get::<_, i32>(7)? != 0,
    })
}

pub fn create_product(conn: &Connection, product: &NewProduct) -> Result<i64> {
    conn.execute(
        "INSERT INTO products (name, description, price, cost_price, stock) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            product.name,
            product.description,
            product.price,
            product.cost_price,
            product.stock
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
        params![id],
        product_from_row,
    )
    .optional()
}

pub fn count_products(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
}

/// Lists products by name; products without an image come first so the
/// admin sees what still needs a photo
pub fn list_products(conn: &Connection, page: &Page) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM products
         ORDER BY image_file_id IS NOT NULL, name COLLATE NOCASE, id
         LIMIT ?1 OFFSET ?2",
        PRODUCT_COLUMNS
    ))?;
    let products = stmt
        .query_map(params![page.limit(), page.offset()], product_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(products)
}

/// Stores the Telegram `file_id` of the product photo. Returns `false` for an unknown product.
pub fn set_product_image(conn: &Connection, id: i64, file_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE products SET image_file_id = ?1 WHERE id = ?2",
        params![file_id, id],
    )?;
    if changed > 0 {
        log::info!("📷 Image set for product {}", id);
    }
    Ok(changed > 0)
}

pub fn clear_product_image(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("UPDATE products SET image_file_id = NULL WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn count_products_without_image(conn: &Connection) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM products WHERE image_file_id IS NULL AND is_active = 1",
        [],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::test_conn;

    fn product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: 99_900,
            cost_price: 45_000,
            stock: 3,
        }
    }

    #[test]
    fn create_and_get() {
        let conn = test_conn();
        let id = create_product(&conn, &product("Свеча")).unwrap();
        let stored = get_product(&conn, id).unwrap().unwrap();
        assert_eq!(stored.name, "Свеча");
        assert_eq!(stored.price, 99_900);
        assert_eq!(stored.cost_price, 45_000);
        assert!(!stored.has_image());
        assert!(stored.is_active);
    }

    #[test]
    fn image_lifecycle() {
        let conn = test_conn();
        let id = create_product(&conn, &product("Плед")).unwrap();
        assert_eq!(count_products_without_image(&conn).unwrap(), 1);

        assert!(set_product_image(&conn, id, "file-1").unwrap());
        assert_eq!(
            get_product(&conn, id).unwrap().unwrap().image_file_id.as_deref(),
            Some("file-1")
        );
        assert_eq!(count_products_without_image(&conn).unwrap(), 0);

        assert!(clear_product_image(&conn, id).unwrap());
        assert_eq!(count_products_without_image(&conn).unwrap(), 1);
    }

    #[test]
    fn set_image_unknown_product() {
        let conn = test_conn();
        assert!(!set_product_image(&conn, 42, "file").unwrap());
    }

    #[test]
    fn list_puts_missing_images_first() {
        let conn = test_conn();
        let a = create_product(&conn, &product("Аромалампа")).unwrap();
        let b = create_product(&conn, &product("Ваза")).unwrap();
        set_product_image(&conn, a, "file").unwrap();

        let page = Page::clamp(0, count_products(&conn).unwrap(), 5);
        let ids: Vec<i64> = list_products(&conn, &page).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
