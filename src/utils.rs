use crate::error::PollError;
use serde_json::Value;
use std::fmt::Display;

/// Review verdict text for every status the API is known to return.
pub const HOMEWORK_VERDICTS: [(&str, &str); 3] = [
    ("approved", "Работа проверена: ревьюеру всё понравилось. Ура!"),
    ("reviewing", "Работа взята на проверку ревьюером."),
    ("rejected", "Работа проверена: у ревьюера есть замечания."),
];

pub fn verdict_for(status: &str) -> Option<&'static str> {
    HOMEWORK_VERDICTS
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, verdict)| *verdict)
}

/// Формирует сообщение о новом статусе работы
pub fn parse_status(homework: &Value) -> Result<String, PollError> {
    let name = homework
        .get("homework_name")
        .filter(|v| !v.is_null())
        .ok_or(PollError::MissingField("homework_name"))?;
    let status = homework
        .get("status")
        .filter(|v| !v.is_null())
        .ok_or(PollError::MissingField("status"))?;

    let status = display_value(status);
    let verdict = verdict_for(&status).ok_or_else(|| PollError::UnknownStatus(status.clone()))?;

    Ok(format!(
        "Изменился статус проверки работы \"{}\". {}",
        display_value(name),
        verdict
    ))
}

/// Текст, который уходит в чат при сбое
pub fn format_failure(error: &impl Display) -> String {
    format!("Сбой в работе программы: {}", error)
}

// Strings are shown without JSON quotes, anything else as raw JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
