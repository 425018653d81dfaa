//! Promo code screens

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::core::config::pagination::PAGE_SIZE;
use crate::core::pagination::Page;
use crate::core::promo::PromoCode;
use crate::storage::promo::{self as store, NewPromo, PromoStoreError};
use crate::telegram::admin::escape_markdown;
use crate::telegram::callbacks::Callback;
use crate::telegram::keyboards::{back_to_menu_row, button, confirm_row, list_header, pagination_row, View};

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "∞".to_string())
}

/// One list entry, MarkdownV2
pub fn describe(promo: &PromoCode, today: NaiveDate) -> String {
    let status = promo.status(today);
    let uses = match promo.max_uses {
        Some(max) => format!("{}/{}", promo.used_count, max),
        None => format!("{}/∞", promo.used_count),
    };
    let period = match (promo.valid_from, promo.valid_until) {
        (None, None) => "бессрочно".to_string(),
        (from, until) => format!("{} … {}", format_date(from), format_date(until)),
    };
    format!(
        "{} `{}` \\-{}%, {}\n    активаций {}, {}",
        status.emoji(),
        escape_markdown(&promo.code),
        promo.discount_percent,
        escape_markdown(status.label()),
        escape_markdown(&uses),
        escape_markdown(&period)
    )
}

pub fn list_view(conn: &Connection, page: u32, today: NaiveDate) -> Result<View> {
    let page = Page::clamp(page, store::count_promos(conn)?, *PAGE_SIZE);
    let promos = store::list_promos(conn, &page)?;

    let mut text = list_header("🎟 Промокоды", &page);
    if promos.is_empty() {
        text.push_str("\n\nПромокодов пока нет\\.");
    }
    let mut rows = Vec::new();
    for promo in &promos {
        text.push_str("\n\n");
        text.push_str(&describe(promo, today));

        let toggle = if promo.is_active { "⏸ Выкл" } else { "▶️ Вкл" };
        rows.push(vec![
            button(
                format!("{} {}", toggle, promo.code),
                Callback::PromoToggle {
                    id: promo.id,
                    page: page.page,
                },
            ),
            button(
                "🗑",
                Callback::PromoDelete {
                    id: promo.id,
                    page: page.page,
                },
            ),
        ]);
    }
    if page.total_pages() > 1 {
        rows.push(pagination_row(&page, |p| Callback::PromoList { page: p }));
    }
    rows.push(vec![button("➕ Новый промокод", Callback::PromoNew)]);
    rows.push(back_to_menu_row());

    Ok(View::new(text, rows))
}

/// Flips the active flag. Returns a notice if the code is gone.
pub fn toggle(conn: &Connection, id: i64) -> Result<Option<String>> {
    let Some(promo) = store::get_promo(conn, id)? else {
        return Ok(Some("Промокод не найден".to_string()));
    };
    store::set_promo_active(conn, id, !promo.is_active)?;
    log::info!(
        "🎟 Promo {} {}",
        promo.code,
        if promo.is_active { "disabled" } else { "enabled" }
    );
    Ok(None)
}

pub fn confirm_delete_view(conn: &Connection, id: i64, page: u32) -> Result<View> {
    let text = match store::get_promo(conn, id)? {
        Some(promo) => format!("Удалить промокод `{}`?", escape_markdown(&promo.code)),
        None => "Промокод не найден\\.".to_string(),
    };
    Ok(View::new(
        text,
        vec![confirm_row(
            Callback::PromoDeleteConfirm { id, page },
            Callback::PromoList { page },
        )],
    ))
}

/// Deletes a code; one already used in orders is disabled instead
pub fn delete(conn: &Connection, id: i64) -> Result<Option<String>> {
    match store::delete_promo(conn, id) {
        Ok(()) => Ok(None),
        Err(PromoStoreError::InUse) => {
            store::set_promo_active(conn, id, false)?;
            Ok(Some(
                "Промокод уже применялся в заказах, поэтому он выключен, а не удалён.".to_string(),
            ))
        }
        Err(PromoStoreError::NotFound) => Ok(Some("Промокод уже удалён".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Saves the promo collected by the wizard. `Err` carries the text for the admin.
pub fn save(conn: &Connection, promo: &NewPromo) -> Result<std::result::Result<String, String>> {
    match store::create_promo(conn, promo) {
        Ok(_) => {
            let limit = promo
                .max_uses
                .map(|n| n.to_string())
                .unwrap_or_else(|| "без ограничений".to_string());
            Ok(Ok(format!(
                "✅ Промокод {} создан\nСкидка: {}%\nАктиваций: {}\nДействует: {} … {}",
                promo.code,
                promo.discount_percent,
                limit,
                format_date(promo.valid_from),
                format_date(promo.valid_until)
            )))
        }
        Err(e @ PromoStoreError::DuplicateCode(_)) => Ok(Err(format!("❌ {}", e))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{add_client, test_conn};
    use rusqlite::params;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
    }

    fn new_promo(code: &str) -> NewPromo {
        NewPromo {
            code: code.to_string(),
            discount_percent: 15,
            max_uses: Some(10),
            valid_from: None,
            valid_until: None,
        }
    }

    #[test]
    fn list_shows_codes_escaped() {
        let conn = test_conn();
        store::create_promo(&conn, &new_promo("SALE-15")).unwrap();
        let view = list_view(&conn, 0, today()).unwrap();
        assert!(view.text.contains("`SALE\\-15`"));
        assert!(view.text.contains("0/10"));
        // toggle/delete row, new, menu
        assert_eq!(view.markup.inline_keyboard.len(), 3);
    }

    #[test]
    fn empty_list() {
        let conn = test_conn();
        let view = list_view(&conn, 3, today()).unwrap();
        assert!(view.text.contains("Промокодов пока нет"));
    }

    #[test]
    fn save_reports_duplicates() {
        let conn = test_conn();
        assert!(save(&conn, &new_promo("DUP")).unwrap().is_ok());
        let second = save(&conn, &new_promo("dup")).unwrap();
        assert!(second.unwrap_err().contains("уже существует"));
    }

    #[test]
    fn toggle_flips_flag() {
        let conn = test_conn();
        let id = store::create_promo(&conn, &new_promo("FLIP")).unwrap();
        assert_eq!(toggle(&conn, id).unwrap(), None);
        assert!(!store::get_promo(&conn, id).unwrap().unwrap().is_active);
        assert!(toggle(&conn, 999).unwrap().is_some());
    }

    #[test]
    fn delete_used_code_disables_it() {
        let conn = test_conn();
        add_client(&conn, 1);
        let id = store::create_promo(&conn, &new_promo("KEEP")).unwrap();
        conn.execute(
            "INSERT INTO orders (client_id, status, subtotal, discount, total, promo_code_id)
             VALUES (1, 'paid', 100, 15, 85, ?1)",
            params![id],
        )
        .unwrap();

        let notice = delete(&conn, id).unwrap();
        assert!(notice.is_some());
        let promo = store::get_promo(&conn, id).unwrap().unwrap();
        assert!(!promo.is_active);
    }
}
