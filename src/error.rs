use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Отсутствуют обязательные переменные окружения: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("Некорректное значение переменной {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything that can go wrong during one poll of the review API.
///
/// Display texts are sent to the chat as-is, so they stay human readable.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Ошибка подключения к API: {0}")]
    ApiUnreachable(#[source] reqwest::Error),
    #[error("Код ответа API не 200: {0}")]
    InvalidResponse(StatusCode),
    #[error("Ответ API не является JSON: {0}")]
    InvalidBody(#[source] reqwest::Error),
    #[error("В ответе API содержится не словарь")]
    NotAMapping,
    #[error("Неправильный ответ API: нет ключа homeworks")]
    MissingHomeworks,
    #[error("В ответе API homeworks не список")]
    HomeworksNotAList,
    #[error("{0} не найден")]
    MissingField(&'static str),
    #[error("{0} не найден в стандартных ответах")]
    UnknownStatus(String),
}
