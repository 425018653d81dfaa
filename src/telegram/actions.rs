//! Action (campaign) screens

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::core::config::pagination::PAGE_SIZE;
use crate::core::pagination::Page;
use crate::storage::actions::{self as store, Action, NewAction};
use crate::storage::products;
use crate::telegram::admin::{escape_markdown, shorten};
use crate::telegram::callbacks::Callback;
use crate::telegram::keyboards::{back_to_menu_row, button, confirm_row, list_header, pagination_row, View};

/// Characters of the description shown in the list
const DESCRIPTION_PREVIEW: usize = 200;

pub fn describe(action: &Action, today: NaiveDate, product_count: usize) -> String {
    let mut line = format!(
        "{} *{}* \\-{}%\n    {} … {}, товаров: {}{}",
        action.status_emoji(today),
        escape_markdown(&action.title),
        action.discount_percent,
        action.starts_on.format("%d\\.%m\\.%Y"),
        action.ends_on.format("%d\\.%m\\.%Y"),
        product_count,
        if action.image_file_id.is_some() { ", 🖼" } else { "" }
    );
    if !action.description.is_empty() {
        let description = shorten(&action.description, DESCRIPTION_PREVIEW);
        line.push_str(&format!("\n    _{}_", escape_markdown(&description)));
    }
    line
}

pub fn list_view(conn: &Connection, page: u32, today: NaiveDate) -> Result<View> {
    let page = Page::clamp(page, store::count_actions(conn)?, *PAGE_SIZE);
    let actions = store::list_actions(conn, &page)?;

    let mut text = list_header("📣 Акции", &page);
    if actions.is_empty() {
        text.push_str("\n\nАкций пока нет\\.");
    }
    let mut rows = Vec::new();
    for action in &actions {
        let product_count = store::action_product_ids(conn, action.id)?.len();
        text.push_str("\n\n");
        text.push_str(&describe(action, today, product_count));

        let p = page.page;
        rows.push(vec![
            button(
                if action.is_active { "⏸" } else { "▶️" },
                Callback::ActionToggle { id: action.id, page: p },
            ),
            button("🛍", Callback::ActionProducts { id: action.id, page: 0 }),
            button("🖼", Callback::ActionImage { id: action.id }),
            button("🗑", Callback::ActionDelete { id: action.id, page: p }),
        ]);
    }
    if page.total_pages() > 1 {
        rows.push(pagination_row(&page, |p| Callback::ActionList { page: p }));
    }
    rows.push(vec![button("➕ Новая акция", Callback::ActionNew)]);
    rows.push(back_to_menu_row());

    Ok(View::new(text, rows))
}

pub fn toggle(conn: &Connection, id: i64) -> Result<Option<String>> {
    let Some(action) = store::get_action(conn, id)? else {
        return Ok(Some("Акция не найдена".to_string()));
    };
    store::set_action_active(conn, id, !action.is_active)?;
    Ok(None)
}

pub fn confirm_delete_view(conn: &Connection, id: i64, page: u32) -> Result<View> {
    let text = match store::get_action(conn, id)? {
        Some(action) => format!("Удалить акцию *{}*?", escape_markdown(&action.title)),
        None => "Акция не найдена\\.".to_string(),
    };
    Ok(View::new(
        text,
        vec![confirm_row(
            Callback::ActionDeleteConfirm { id, page },
            Callback::ActionList { page },
        )],
    ))
}

pub fn delete(conn: &Connection, id: i64) -> Result<Option<String>> {
    if store::delete_action(conn, id)? {
        Ok(None)
    } else {
        Ok(Some("Акция уже удалена".to_string()))
    }
}

/// Catalog page with a check mark on products taking part in the action
pub fn products_view(conn: &Connection, action_id: i64, page: u32) -> Result<View> {
    let Some(action) = store::get_action(conn, action_id)? else {
        return Ok(View::new("Акция не найдена\\.", vec![back_to_menu_row()]));
    };
    let linked = store::action_product_ids(conn, action_id)?;
    let page = Page::clamp(page, products::count_products(conn)?, *PAGE_SIZE);
    let items = products::list_products(conn, &page)?;

    let text = format!(
        "{}\n\nТовары в акции *{}*: {}\\. Нажми на товар, чтобы добавить или убрать его\\.",
        list_header("🛍 Товары акции", &page),
        escape_markdown(&action.title),
        linked.len()
    );
    let mut rows: Vec<_> = items
        .iter()
        .map(|product| {
            let mark = if linked.contains(&product.id) { "✅" } else { "▫️" };
            vec![button(
                format!("{} {}", mark, product.name),
                Callback::ActionLink {
                    id: action_id,
                    product_id: product.id,
                    page: page.page,
                },
            )]
        })
        .collect();
    if page.total_pages() > 1 {
        rows.push(pagination_row(&page, |p| Callback::ActionProducts { id: action_id, page: p }));
    }
    rows.push(vec![button("↩️ К акциям", Callback::ActionList { page: 0 })]);

    Ok(View::new(text, rows))
}

/// Adds the product to the action, or removes it if already there
pub fn toggle_product(conn: &Connection, action_id: i64, product_id: i64) -> Result<()> {
    if !store::attach_product(conn, action_id, product_id)? {
        store::detach_product(conn, action_id, product_id)?;
    }
    Ok(())
}

/// Saves the action collected by the wizard and returns its ID with a confirmation text
pub fn save(conn: &Connection, action: &NewAction) -> Result<(i64, String)> {
    let id = store::create_action(conn, action)?;
    let text = format!(
        "✅ Акция «{}» создана\nСкидка: {}%\nПериод: {} … {}",
        action.title,
        action.discount_percent,
        action.starts_on.format("%d.%m.%Y"),
        action.ends_on.format("%d.%m.%Y")
    );
    Ok((id, text))
}
