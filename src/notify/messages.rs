use std::borrow::Cow;

use crate::models::{Application, ApplicationStatus};

/// Localized label for a stored status value. Unknown values render as-is.
pub fn status_label(status: &str) -> Cow<'_, str> {
    match status.parse::<ApplicationStatus>() {
        Ok(known) => Cow::Borrowed(known.label()),
        Err(_) => Cow::Borrowed(status),
    }
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

pub fn new_application_message(agent_full_name: &str, application: &Application) -> String {
    let mut text = format!(
        "🆕 <b>Новая заявка</b>\n\n\
         👤 <b>Агент:</b> {agent}\n\
         👥 <b>Клиент:</b> {client}\n\
         📞 <b>Телефон:</b> {phone}\n\
         📍 <b>Адрес:</b> {address}",
        agent = escape_html(agent_full_name),
        client = escape_html(&application.client_full_name),
        phone = escape_html(&application.client_phone),
        address = escape_html(&application.client_address),
    );

    if let Some(comment) = application.comment.as_deref() {
        text.push_str(&format!(
            "\n💬 <b>Комментарий:</b> {}",
            escape_html(comment)
        ));
    }

    text.push_str(&format!(
        "\n\n📊 <b>Статус:</b> {}",
        status_label(&application.status)
    ));
    text
}

pub fn status_changed_message(application: &Application) -> String {
    format!(
        "📊 <b>Обновление статуса заявки</b>\n\n\
         👥 <b>Клиент:</b> {client}\n\
         📞 <b>Телефон:</b> {phone}\n\
         📍 <b>Адрес:</b> {address}\n\n\
         🔄 <b>Новый статус:</b> {status}",
        client = escape_html(&application.client_full_name),
        phone = escape_html(&application.client_phone),
        address = escape_html(&application.client_address),
        status = status_label(&application.status),
    )
}
