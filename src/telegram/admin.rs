//! Who counts as an admin, plus small text helpers shared by the admin views
//!
//! - admin lookup against `ADMIN_IDS` / `ADMIN_USER_ID`
//! - MarkdownV2 escaping and cutting text down to one message
//! - the /backup command

use anyhow::Result;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::User;

use crate::core::config;
use crate::core::config::admin::{ADMIN_IDS, ADMIN_USER_ID};
use crate::storage::backup::{create_backup, list_backups};
use crate::telegram::Bot;

/// Longest text we put into one message; Telegram's hard limit is 4096
const MESSAGE_LIMIT: usize = 4000;

const CUT_MARKER: &str = "\n… (обрезано)";

/// Characters that must be backslash-escaped in MarkdownV2
const MARKDOWN_V2_SPECIAL: &str = "\\_*[]()~`>#+-=|{}.!";

pub const ACCESS_DENIED: &str = "❌ У тебя нет прав для выполнения этой команды.";

/// Cuts `text` so it fits a single Telegram message
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let keep = MESSAGE_LIMIT - CUT_MARKER.chars().count();
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(CUT_MARKER);
    cut
}

/// Cuts already escaped MarkdownV2 text so it fits a single message.
///
/// The cut never lands between a backslash and the character it escapes.
pub fn clamp_markdown(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let marker = escape_markdown(CUT_MARKER);
    let keep = MESSAGE_LIMIT - marker.chars().count();
    let mut cut: String = text.chars().take(keep).collect();
    let trailing = cut.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        cut.pop();
    }
    cut.push_str(&marker);
    cut
}

/// First `max_chars` characters of `text`, with an ellipsis when something was cut
pub fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// `ADMIN_IDS` when configured, otherwise the single `ADMIN_USER_ID`
pub fn is_admin(user_id: i64) -> bool {
    if ADMIN_IDS.is_empty() {
        *ADMIN_USER_ID != 0 && *ADMIN_USER_ID == user_id
    } else {
        ADMIN_IDS.contains(&user_id)
    }
}

/// Telegram user ID as stored in the database
pub fn user_id_of(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(0)
}

/// Escapes user-provided text for a MarkdownV2 message
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// /backup: snapshot the live database into `BACKUP_DIR` and report the result
pub async fn handle_backup_command(bot: &Bot, chat_id: ChatId, user_id: i64) -> Result<()> {
    if !is_admin(user_id) {
        bot.send_message(chat_id, ACCESS_DENIED).await?;
        return Ok(());
    }

    let backup_dir = Path::new(config::BACKUP_DIR.as_str());
    let reply = match create_backup(&config::DATABASE_PATH, backup_dir) {
        Ok(path) => {
            log::info!("💾 Backup requested by admin {}: {}", user_id, path.display());
            let total = list_backups(backup_dir).map(|b| b.len()).unwrap_or(0);
            format!("💾 Бэкап готов: {}\nХранится копий: {}", path.display(), total)
        }
        Err(e) => {
            log::error!("❌ Backup failed: {}", e);
            format!("❌ Не удалось сделать бэкап: {}", e)
        }
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_markdown_special_chars() {
        assert_eq!(escape_markdown("SALE-10"), "SALE\\-10");
        assert_eq!(escape_markdown("1 234.50 ₽"), "1 234\\.50 ₽");
        assert_eq!(escape_markdown("(a_b)!"), "\\(a\\_b\\)\\!");
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
        assert_eq!(escape_markdown("Привет"), "Привет");
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn long_text_fits_one_message() {
        let long = "я".repeat(MESSAGE_LIMIT + 100);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MESSAGE_LIMIT);
        assert!(cut.ends_with("(обрезано)"));
    }

    #[test]
    fn escaped_punctuation_clamped_to_one_message() {
        let escaped = escape_markdown(&".".repeat(MESSAGE_LIMIT));
        assert_eq!(escaped.chars().count(), MESSAGE_LIMIT * 2);

        let cut = clamp_markdown(&escaped);
        assert!(cut.chars().count() <= MESSAGE_LIMIT);
        assert!(cut.ends_with("\\(обрезано\\)"));
        // every dot before the marker keeps its backslash
        let body = cut.trim_end_matches(&escape_markdown(CUT_MARKER));
        assert!(body.chars().count() % 2 == 0);
        assert!(body.ends_with("\\."));
    }

    #[test]
    fn clamp_keeps_escaped_backslashes_paired() {
        let escaped = escape_markdown(&"\\".repeat(MESSAGE_LIMIT));
        let cut = clamp_markdown(&escaped);
        let body = cut.trim_end_matches(&escape_markdown(CUT_MARKER));
        assert!(body.chars().all(|c| c == '\\'));
        assert_eq!(body.chars().count() % 2, 0);
        assert_eq!(clamp_markdown("short"), "short");
    }

    #[test]
    fn shorten_marks_the_cut() {
        assert_eq!(shorten("abc", 5), "abc");
        assert_eq!(shorten("abcdef", 4), "abc…");
        assert_eq!(shorten("абвгд", 3).chars().count(), 3);
    }

    #[test]
    fn unknown_user_is_not_admin() {
        // no admin has a negative ID
        assert!(!is_admin(-1));
    }
}
