//! Sales statistics screen and the plain-text report used by the CLI

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::core::config::stats::{CHART_DAYS, TOP_PRODUCTS};
use crate::core::types::{format_money, StatsPeriod};
use crate::storage::stats::{self as store, DailySales, SalesSummary};
use crate::telegram::admin::escape_markdown;
use crate::telegram::callbacks::Callback;
use crate::telegram::keyboards::{back_to_menu_row, button, View};

/// Width of the longest bar in the activity chart
const BAR_WIDTH: usize = 12;

/// Revenue for each of the last `days` days ending at `to`, with gaps filled by zeros
pub fn fill_days(sales: &[DailySales], from: NaiveDate, to: NaiveDate, days: usize) -> Vec<(NaiveDate, i64)> {
    let span = (to - from).num_days() + 1;
    let days = (days as i64).min(span).max(0);
    (0..days)
        .rev()
        .map(|back| {
            let day = to - Duration::days(back);
            let revenue = sales
                .iter()
                .find(|s| s.date == day)
                .map(|s| s.revenue)
                .unwrap_or(0);
            (day, revenue)
        })
        .collect()
}

/// One `█░` bar per day, scaled to the best day
pub fn render_chart(points: &[(NaiveDate, i64)]) -> Vec<String> {
    let max = points.iter().map(|(_, r)| *r).max().unwrap_or(0);
    points
        .iter()
        .map(|(day, revenue)| {
            let filled = if max > 0 {
                ((*revenue as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            // a day with any sales gets at least one block
            let filled = if *revenue > 0 { filled.max(1) } else { 0 };
            format!(
                "{} {}{} {}",
                day.format("%d.%m"),
                "█".repeat(filled),
                "░".repeat(BAR_WIDTH - filled),
                format_money(*revenue)
            )
        })
        .collect()
}

fn summary_lines(summary: &SalesSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Заказов: {}", summary.orders),
        format!("Продано товаров: {}", summary.items_sold),
        format!("Выручка: {}", format_money(summary.revenue)),
        format!("Себестоимость: {}", format_money(summary.cost)),
        format!("Скидки по промокодам: {}", format_money(summary.discounts)),
        format!("Прибыль: {}", format_money(summary.profit)),
        format!("Средний чек: {}", format_money(summary.average_check)),
    ];
    if let Some(margin) = summary.margin_percent() {
        lines.push(format!("Маржа: {:.1}%", margin));
    }
    lines
}

pub fn stats_view(conn: &Connection, period: StatsPeriod, today: NaiveDate) -> Result<View> {
    let (from, to) = period.bounds(today);
    let summary = store::sales_summary(conn, from, to)?;
    let daily = store::daily_sales(conn, from, to)?;
    let top = store::top_products(conn, from, to, TOP_PRODUCTS)?;
    let promos = store::promo_effectiveness(conn, from, to)?;
    let new_clients = store::new_clients(conn, from, to)?;

    let mut text = format!("📊 *Статистика за {}*\n", escape_markdown(&period.label()));
    for line in summary_lines(&summary) {
        text.push('\n');
        text.push_str(&escape_markdown(&line));
    }
    text.push_str(&format!("\nНовых клиентов: {}", new_clients));

    if summary.orders > 0 {
        let chart = render_chart(&fill_days(&daily, from, to, CHART_DAYS));
        text.push_str("\n\n📈 *По дням*\n```\n");
        text.push_str(&chart.join("\n"));
        text.push_str("\n```");
    }

    if !top.is_empty() {
        text.push_str("\n\n🏆 *Топ товаров*");
        for (idx, product) in top.iter().enumerate() {
            text.push_str(&format!(
                "\n{}\\. {}: {} шт\\., {}, прибыль {}",
                idx + 1,
                escape_markdown(&product.name),
                product.quantity,
                escape_markdown(&format_money(product.revenue)),
                escape_markdown(&format_money(product.profit))
            ));
        }
    }

    if !promos.is_empty() {
        text.push_str("\n\n🎟 *Промокоды*");
        for promo in &promos {
            text.push_str(&format!(
                "\n`{}`: {} заказов, скидка {}, выручка {}",
                escape_markdown(&promo.code),
                promo.uses,
                escape_markdown(&format_money(promo.discount_given)),
                escape_markdown(&format_money(promo.revenue))
            ));
        }
    }

    let presets: Vec<_> = StatsPeriod::presets()
        .iter()
        .map(|preset| {
            let label = if *preset == period {
                format!("• {}", preset.label())
            } else {
                preset.label()
            };
            button(label, Callback::Stats(*preset))
        })
        .collect();
    let mut rows: Vec<_> = presets.chunks(3).map(|chunk| chunk.to_vec()).collect();
    rows.push(vec![button("📅 Свой период", Callback::StatsCustom)]);
    rows.push(back_to_menu_row());

    Ok(View::new(text, rows))
}

/// Plain-text report for the terminal
pub fn render_summary(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<String> {
    let summary = store::sales_summary(conn, from, to)?;
    let top = store::top_products(conn, from, to, TOP_PRODUCTS)?;
    let new_clients = store::new_clients(conn, from, to)?;

    let mut out = format!("Статистика {} … {}\n", from, to);
    for line in summary_lines(&summary) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("Новых клиентов: {}\n", new_clients));
    if !top.is_empty() {
        out.push_str("\nТоп товаров:\n");
        for (idx, product) in top.iter().enumerate() {
            out.push_str(&format!(
                "{:>2}. {} x{} {}\n",
                idx + 1,
                product.name,
                product.quantity,
                format_money(product.revenue)
            ));
        }
    }
    Ok(out)
}
