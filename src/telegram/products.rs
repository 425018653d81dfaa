//! Product screens and image upload

use anyhow::Result;
use rusqlite::Connection;
use teloxide::types::{Message, PhotoSize};

use crate::core::config::pagination::PAGE_SIZE;
use crate::core::pagination::Page;
use crate::core::types::format_money;
use crate::storage::products::{self as store, Product};
use crate::telegram::admin::escape_markdown;
use crate::telegram::callbacks::Callback;
use crate::telegram::keyboards::{back_to_menu_row, button, list_header, pagination_row, View};

pub fn describe(product: &Product) -> String {
    format!(
        "{} *{}*\n    {} \\(себестоимость {}\\), остаток {}{}",
        if product.has_image() { "🖼" } else { "📷❗️" },
        escape_markdown(&product.name),
        escape_markdown(&format_money(product.price)),
        escape_markdown(&format_money(product.cost_price)),
        product.stock,
        if product.is_active { "" } else { ", скрыт" }
    )
}

pub fn list_view(conn: &Connection, page: u32) -> Result<View> {
    let page = Page::clamp(page, store::count_products(conn)?, *PAGE_SIZE);
    let products = store::list_products(conn, &page)?;
    let missing = store::count_products_without_image(conn)?;

    let mut text = list_header("🛍 Товары", &page);
    text.push_str(&format!("\nБез фото: {}", missing));
    if products.is_empty() {
        text.push_str("\n\nКаталог пуст\\.");
    }

    let mut rows = Vec::new();
    for product in &products {
        text.push_str("\n\n");
        text.push_str(&describe(product));

        let mut row = vec![button(
            format!("📷 {}", product.name),
            Callback::ProductImage { id: product.id },
        )];
        if product.has_image() {
            row.push(button(
                "🗑 фото",
                Callback::ProductImageClear {
                    id: product.id,
                    page: page.page,
                },
            ));
        }
        rows.push(row);
    }
    if page.total_pages() > 1 {
        rows.push(pagination_row(&page, |p| Callback::ProductList { page: p }));
    }
    rows.push(back_to_menu_row());

    Ok(View::new(text, rows))
}

/// `file_id` of an uploaded image: the largest photo size, or a document with an image MIME type
pub fn image_file_id(msg: &Message) -> Option<String> {
    if let Some(photos) = msg.photo() {
        return largest_photo(photos).map(|p| p.file.id.to_string());
    }
    let document = msg.document()?;
    let is_image = document
        .mime_type
        .as_ref()
        .is_some_and(|mime| mime.essence_str().starts_with("image/"));
    is_image.then(|| document.file.id.to_string())
}

fn largest_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

/// Stores an uploaded image for a product and returns the confirmation text
pub fn save_image(conn: &Connection, product_id: i64, file_id: &str) -> Result<String> {
    if !store::set_product_image(conn, product_id, file_id)? {
        return Ok("❌ Товар не найден".to_string());
    }
    let name = store::get_product(conn, product_id)?
        .map(|p| p.name)
        .unwrap_or_default();
    Ok(format!("✅ Фото для «{}» сохранено", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::products::{create_product, NewProduct};
    use crate::storage::test_support::test_conn;

    fn add(conn: &Connection, name: &str) -> i64 {
        create_product(
            conn,
            &NewProduct {
                name: name.to_string(),
                description: String::new(),
                price: 123_450,
                cost_price: 50_000,
                stock: 2,
            },
        )
        .unwrap()
    }

    #[test]
    fn list_marks_missing_images() {
        let conn = test_conn();
        add(&conn, "Кружка");
        let view = list_view(&conn, 0).unwrap();
        assert!(view.text.contains("Без фото: 1"));
        assert!(view.text.contains("📷❗️ *Кружка*"));
        assert!(view.text.contains("1 234\\.50 ₽"));
        assert_eq!(view.markup.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn save_image_updates_product() {
        let conn = test_conn();
        let id = add(&conn, "Кружка");
        assert_eq!(save_image(&conn, id, "photo-file").unwrap(), "✅ Фото для «Кружка» сохранено");
        let view = list_view(&conn, 0).unwrap();
        assert!(view.text.contains("Без фото: 0"));
        assert_eq!(view.markup.inline_keyboard[0].len(), 2);

        assert!(save_image(&conn, 999, "x").unwrap().starts_with("❌"));
    }
}
