use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;

use crm_core::{
    domain::{is_valid_phone, AccountId},
    errors::Error,
    pending::Intent,
};
use crm_db::{Contact, Direction, Message as StoredMessage};

use crate::router::AppState;

const HELP: &str = "CRM commands:\n\
/add_contact <phone> <name> - create a contact and try to link it\n\
/contacts [page] - recent contacts, or a listing page\n\
/delete_contact <contact_id> - remove a contact and its history\n\
/find <query> - search by name, phone or note\n\
/history <contact_id> - conversation history\n\
/send <contact_id> [text] - message a contact\n\
/link <contact_id> - retry platform linking\n\
/import_all - link every unlinked contact (rate-limited)\n\
/add_admin <id> <username> - register an admin\n\
/remove_admin <@username|id> - drop an admin\n\
/list_admins - show the registry\n\
/dedup_admins - remove duplicate registry rows\n\
/stats - usage counters";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);

    let reply = match run_command(&cmd, &args, &msg, &state).await {
        Ok(reply) => reply,
        Err(Error::Validation(reason)) => format!("Invalid request: {reason}"),
        Err(e) => {
            tracing::error!(command = %cmd, "command failed: {e}");
            "Something went wrong, check the logs.".to_string()
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn run_command(
    cmd: &str,
    args: &str,
    msg: &Message,
    state: &Arc<AppState>,
) -> crm_core::Result<String> {
    match cmd {
        "start" | "help" => Ok(HELP.to_string()),
        "add_contact" => add_contact(args, state).await,
        "contacts" => contacts(args, state).await,
        "delete_contact" => delete_contact(args, state).await,
        "find" => find(args, state).await,
        "history" => history(args, state).await,
        "send" => send(args, msg, state).await,
        "link" => link(args, state).await,
        "import_all" => import_all(state).await,
        "add_admin" => add_admin(args, state).await,
        "remove_admin" => remove_admin(args, state).await,
        "list_admins" => list_admins(state).await,
        "dedup_admins" => dedup_admins(state).await,
        "stats" => stats(state).await,
        _ => Ok("Unknown command. Send /start for the command list.".to_string()),
    }
}

async fn add_contact(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let phone = parts.next().unwrap_or("").trim();
    let name = parts.next().unwrap_or("").trim();

    if !is_valid_phone(phone) {
        return Err(Error::Validation(
            "phone must look like +79001234567".to_string(),
        ));
    }
    if name.is_empty() {
        return Err(Error::Validation("usage: /add_contact <phone> <name>".to_string()));
    }

    let contact = state.db.add_contact(name, phone, None, None).await?;

    // The contact exists whatever the import says; linking is best-effort.
    let link = state.importer.link_contact(contact.id).await?;
    let status = if link.success {
        "linked to a Telegram account".to_string()
    } else {
        format!("not linked yet ({}); retry later with /link {}", link.message, contact.id)
    };

    Ok(format!("Contact #{} {} saved, {}.", contact.id, contact.name, status))
}

async fn contacts(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let page_size = state.cfg.contacts_page_size as i64;

    let (page, header) = if args.is_empty() {
        (state.db.recent_contacts(page_size).await?, "Recent contacts:".to_string())
    } else {
        let number = parse_id(args, "usage: /contacts [page]")?.max(1);
        let rows = state
            .db
            .list_contacts(page_size, (number - 1) * page_size)
            .await?;
        (rows, format!("Contacts, page {number}:"))
    };

    if page.is_empty() {
        return Ok("No contacts here.".to_string());
    }

    let mut out = header;
    out.push('\n');
    for contact in &page {
        out.push_str(&format_contact_line(contact));
        out.push('\n');
    }
    Ok(out)
}

async fn delete_contact(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let contact_id = parse_id(args, "usage: /delete_contact <contact_id>")?;
    let contact = state
        .db
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| Error::Validation(format!("no contact with id {contact_id}")))?;

    state.db.delete_contact(contact_id).await?;
    Ok(format!("Contact #{} {} deleted, history included.", contact.id, contact.name))
}

async fn find(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    if args.is_empty() {
        return Err(Error::Validation("usage: /find <query>".to_string()));
    }

    let hits = state.db.search_contacts(args).await?;
    if hits.is_empty() {
        return Ok(format!("Nothing found for \"{args}\"."));
    }

    let mut out = format!("{} match(es):\n", hits.len());
    for contact in &hits {
        out.push_str(&format_contact_line(contact));
        out.push('\n');
    }
    Ok(out)
}

async fn history(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let contact_id = parse_id(args, "usage: /history <contact_id>")?;
    let contact = state
        .db
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| Error::Validation(format!("no contact with id {contact_id}")))?;

    let mut page = state
        .db
        .history(contact_id, state.cfg.history_page_size as i64)
        .await?;
    if page.is_empty() {
        return Ok(format!("No messages with {} yet.", contact.name));
    }

    // The log hands out most-recent-first; the operator reads oldest-first.
    page.reverse();

    let mut out = format!("History with {} ({}):\n", contact.name, contact.phone);
    for message in &page {
        out.push_str(&format_history_line(message));
        out.push('\n');
    }
    Ok(out)
}

async fn send(args: &str, msg: &Message, state: &Arc<AppState>) -> crm_core::Result<String> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let contact_id = parse_id(parts.next().unwrap_or(""), "usage: /send <contact_id> [text]")?;
    let body = parts.next().unwrap_or("").trim();

    let contact = state
        .db
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| Error::Validation(format!("no contact with id {contact_id}")))?;

    if body.is_empty() {
        // Two-step flow: arm an intent and wait for the next operator text.
        if let Some(user) = msg.from() {
            state
                .pending
                .set(user.id.0 as i64, Intent::MessageBody { contact_id })
                .await;
        }
        return Ok(format!(
            "Send the text for {} ({}) as your next message.",
            contact.name, contact.phone
        ));
    }

    state.pipeline.send_to_contact(&contact, body).await?;
    Ok(format!("Sent to {}.", contact.name))
}

/// Second half of the two-step /send flow.
pub async fn complete_send(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    contact_id: i64,
    body: &str,
) -> ResponseResult<()> {
    let reply = match deliver_pending(&state, contact_id, body).await {
        Ok(name) => format!("Sent to {name}."),
        Err(Error::Validation(reason)) => format!("Invalid request: {reason}"),
        Err(e) => {
            tracing::error!(contact_id, "pending send failed: {e}");
            "Sending failed, check the logs.".to_string()
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn deliver_pending(
    state: &Arc<AppState>,
    contact_id: i64,
    body: &str,
) -> crm_core::Result<String> {
    let contact = state
        .db
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| Error::Validation(format!("no contact with id {contact_id}")))?;
    state.pipeline.send_to_contact(&contact, body).await?;
    Ok(contact.name)
}

async fn link(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let contact_id = parse_id(args, "usage: /link <contact_id>")?;
    let result = state.importer.link_contact(contact_id).await?;

    if result.success {
        let handle = result
            .username
            .map(|u| format!(" (@{u})"))
            .unwrap_or_default();
        Ok(format!("Contact #{contact_id} linked{handle}."))
    } else {
        Ok(format!("Contact #{contact_id} not linked: {}.", result.message))
    }
}

async fn import_all(state: &Arc<AppState>) -> crm_core::Result<String> {
    let report = state.importer.link_all_unlinked().await?;
    let skipped = report.total - report.imported - report.failed;
    Ok(format!(
        "Import finished: {} linked, {} unresolved, {} left for the next run.",
        report.imported, report.failed, skipped
    ))
}

async fn add_admin(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let mut parts = args.split_whitespace();
    let id = parse_id(parts.next().unwrap_or(""), "usage: /add_admin <id> <username>")?;
    let username = parts
        .next()
        .map(|u| u.trim_start_matches('@'))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::Validation("usage: /add_admin <id> <username>".to_string()))?;

    let account = AccountId(id);
    if state.auth.is_authorized(account).await? {
        return Ok(format!("{username} is already an admin."));
    }
    let admin = state.auth.add_admin(username, account).await?;
    Ok(format!("Admin @{} added.", admin.username))
}

async fn remove_admin(args: &str, state: &Arc<AppState>) -> crm_core::Result<String> {
    let target = args.trim();
    if target.is_empty() {
        return Err(Error::Validation(
            "usage: /remove_admin <@username|id>".to_string(),
        ));
    }

    let id = if let Ok(id) = target.parse::<i64>() {
        id
    } else {
        let username = target.trim_start_matches('@');
        state
            .db
            .get_admin_by_username(username)
            .await?
            .ok_or_else(|| Error::Validation(format!("no admin named @{username}")))?
            .telegram_user_id
    };

    let removed = state.auth.remove_admin(AccountId(id)).await?;
    if removed == 0 {
        Ok("No matching admin rows.".to_string())
    } else {
        Ok(format!("Removed {removed} admin row(s)."))
    }
}

async fn list_admins(state: &Arc<AppState>) -> crm_core::Result<String> {
    let admins = state.auth.list_admins().await?;
    if admins.is_empty() {
        return Ok("The registry is empty; only the owner has access.".to_string());
    }

    let mut out = String::from("Admins:\n");
    for admin in &admins {
        out.push_str(&format!(
            "@{} ({}) since {}\n",
            admin.username,
            admin.telegram_user_id,
            format_ts(admin.date_added)
        ));
    }
    Ok(out)
}

async fn dedup_admins(state: &Arc<AppState>) -> crm_core::Result<String> {
    let removed = state.auth.deduplicate().await?;
    Ok(format!("Removed {removed} duplicate row(s)."))
}

async fn stats(state: &Arc<AppState>) -> crm_core::Result<String> {
    let snapshot = state.stats.snapshot().await?;
    Ok(format!(
        "Contacts: {}\nMessages: {} total, {} today, {} this week",
        snapshot.contacts, snapshot.messages, snapshot.messages_today, snapshot.messages_week
    ))
}

fn parse_id(raw: &str, usage: &str) -> crm_core::Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Validation(usage.to_string()))
}

fn format_contact_line(contact: &Contact) -> String {
    let linked = if contact.telegram_user_id.is_some() {
        "linked"
    } else {
        "unlinked"
    };
    let note = contact
        .note
        .as_deref()
        .map(|n| format!(" - {n}"))
        .unwrap_or_default();
    format!("#{} {} {} [{}]{}", contact.id, contact.name, contact.phone, linked, note)
}

fn format_history_line(message: &StoredMessage) -> String {
    let arrow = match message.direction {
        Direction::Incoming => "<-",
        Direction::Outgoing => "->",
    };
    format!("{} [{}] {}", arrow, format_ts(message.timestamp), message.text)
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use crm_db::MediaType;

    use super::*;

    #[test]
    fn command_parsing_strips_bot_suffix() {
        assert_eq!(
            parse_command("/add_contact@crm_bot +7900 Ivan"),
            ("add_contact".to_string(), "+7900 Ivan".to_string())
        );
        assert_eq!(parse_command("/stats"), ("stats".to_string(), String::new()));
        assert_eq!(
            parse_command("  /FIND  ivan  "),
            ("find".to_string(), "ivan".to_string())
        );
    }

    #[test]
    fn contact_line_shows_link_state_and_note() {
        let contact = Contact {
            id: 3,
            name: "Ivan".to_string(),
            phone: "+70000000001".to_string(),
            note: Some("warm lead".to_string()),
            telegram_user_id: None,
            date_added: 0,
        };
        let line = format_contact_line(&contact);
        assert!(line.contains("#3 Ivan"));
        assert!(line.contains("[unlinked]"));
        assert!(line.contains("warm lead"));
    }

    #[test]
    fn history_line_marks_direction() {
        let message = StoredMessage {
            id: 1,
            contact_id: 3,
            message_id: 10,
            direction: Direction::Outgoing,
            text: "hello".to_string(),
            media_type: MediaType::Text,
            media_file_id: None,
            timestamp: 0,
        };
        let line = format_history_line(&message);
        assert!(line.starts_with("->"));
        assert!(line.contains("1970-01-01"));
        assert!(line.ends_with("hello"));
    }
}
