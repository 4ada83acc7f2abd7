use crate::api_client::{check_response, current_date, CheckOutcome, HomeworkSource};
use crate::bot::Notifier;
use crate::error::PollError;
use crate::utils::{format_failure, parse_status};
use std::time::Duration;
use tracing::{debug, error};

/// What a single poll ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new status message was delivered to the chat.
    Notified,
    /// A new status message was produced but the chat did not accept it.
    NotDelivered,
    /// The latest status matches the last delivered message.
    Unchanged,
    /// The API returned an empty `homeworks` list.
    NoNewStatuses,
    /// Something failed; `reported` is true when the failure text reached the chat.
    Failed { reported: bool },
}

/// Polling state: the query window cursor plus the last texts delivered on
/// the status and error channels. Both texts live only as long as the process.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    cursor: i64,
    last_message: Option<String>,
    last_error: Option<String>,
}

impl<S, N> Poller<S, N>
where
    S: HomeworkSource,
    N: Notifier,
{
    pub fn new(source: S, notifier: N, since: i64) -> Self {
        Self {
            source,
            notifier,
            cursor: since,
            last_message: None,
            last_error: None,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Polls forever, sleeping `period` after every iteration whatever it returned.
    pub async fn run(&mut self, period: Duration) {
        loop {
            let outcome = self.poll_once().await;
            debug!("Итерация завершена: {:?}, from_date={}", outcome, self.cursor());
            debug!("Бот ожидает {} секунд", period.as_secs());
            tokio::time::sleep(period).await;
        }
    }

    pub async fn poll_once(&mut self) -> PollOutcome {
        match self.latest_status().await {
            Ok(Some(message)) => self.report_status(message).await,
            Ok(None) => {
                debug!("Новые статусы отсутствуют");
                PollOutcome::NoNewStatuses
            }
            Err(err) => self.report_failure(&err).await,
        }
    }

    async fn latest_status(&mut self) -> Result<Option<String>, PollError> {
        let raw = self.source.fetch(self.cursor).await?;
        if let Some(date) = current_date(&raw) {
            self.cursor = date;
        }

        match check_response(raw)? {
            CheckOutcome::NoNewStatuses => Ok(None),
            CheckOutcome::Homeworks(records) => records.first().map(parse_status).transpose(),
        }
    }

    async fn report_status(&mut self, message: String) -> PollOutcome {
        if self.last_message.as_deref() == Some(message.as_str()) {
            debug!("Статус работы не изменился");
            return PollOutcome::Unchanged;
        }

        if self.notifier.send(&message).await {
            self.last_message = Some(message);
            PollOutcome::Notified
        } else {
            PollOutcome::NotDelivered
        }
    }

    async fn report_failure(&mut self, err: &PollError) -> PollOutcome {
        let text = format_failure(err);
        error!("{}", text);

        if self.last_error.as_deref() == Some(text.as_str()) {
            return PollOutcome::Failed { reported: false };
        }

        let reported = self.notifier.send(&text).await;
        if reported {
            self.last_error = Some(text);
        }
        PollOutcome::Failed { reported }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replays queued answers; once the queue is drained every fetch fails
    /// with the same error.
    #[derive(Clone, Default)]
    struct FakeSource {
        answers: Arc<Mutex<VecDeque<Result<Value, PollError>>>>,
        requested: Arc<Mutex<Vec<i64>>>,
    }

    impl FakeSource {
        fn with(answers: Vec<Result<Value, PollError>>) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers.into())),
                ..Self::default()
            }
        }

        fn requested(&self) -> Vec<i64> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HomeworkSource for FakeSource {
        async fn fetch(&self, since: i64) -> Result<Value, PollError> {
            self.requested.lock().unwrap().push(since);
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(PollError::InvalidResponse(StatusCode::SERVICE_UNAVAILABLE)))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        broken: Arc<AtomicBool>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> bool {
            if self.broken.load(Ordering::SeqCst) {
                return false;
            }
            self.sent.lock().unwrap().push(text.to_string());
            true
        }
    }

    fn homework(name: &str, status: &str) -> Value {
        json!({"homeworks": [{"homework_name": name, "status": status}], "current_date": 1000})
    }

    fn poller(answers: Vec<Result<Value, PollError>>) -> (Poller<FakeSource, RecordingNotifier>, FakeSource, RecordingNotifier) {
        let source = FakeSource::with(answers);
        let notifier = RecordingNotifier::default();
        (Poller::new(source.clone(), notifier.clone(), 500), source, notifier)
    }

    #[tokio::test]
    async fn approved_status_is_sent_and_cursor_advances() {
        let (mut poller, source, notifier) = poller(vec![Ok(homework("hw1", "approved"))]);

        assert_eq!(poller.poll_once().await, PollOutcome::Notified);

        assert_eq!(source.requested(), vec![500]);
        assert_eq!(poller.cursor(), 1000);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("hw1"));
        assert!(sent[0].contains("Работа проверена: ревьюеру всё понравилось. Ура!"));
    }

    #[tokio::test]
    async fn empty_list_sends_nothing_but_advances_cursor() {
        let (mut poller, _source, notifier) =
            poller(vec![Ok(json!({"homeworks": [], "current_date": 1000}))]);

        assert_eq!(poller.poll_once().await, PollOutcome::NoNewStatuses);
        assert_eq!(poller.cursor(), 1000);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn same_status_is_sent_once() {
        let (mut poller, _source, notifier) = poller(vec![
            Ok(homework("hw1", "reviewing")),
            Ok(homework("hw1", "reviewing")),
            Ok(homework("hw1", "approved")),
        ]);

        assert_eq!(poller.poll_once().await, PollOutcome::Notified);
        assert_eq!(poller.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(poller.poll_once().await, PollOutcome::Notified);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].ends_with("Работа взята на проверку ревьюером."));
        assert!(sent[1].ends_with("Работа проверена: ревьюеру всё понравилось. Ура!"));
    }

    #[tokio::test]
    async fn unknown_status_is_reported_once() {
        let bad = || Ok(json!({"homeworks": [{"homework_name": "hw1", "status": "unknown_status"}]}));
        let (mut poller, _source, notifier) = poller(vec![bad(), bad()]);

        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: true });
        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: false });

        // No current_date in the answer, so the window stays where it was.
        assert_eq!(poller.cursor(), 500);
        assert_eq!(
            notifier.sent(),
            vec!["Сбой в работе программы: unknown_status не найден в стандартных ответах".to_string()]
        );
    }

    #[tokio::test]
    async fn server_error_is_debounced_until_error_changes() {
        let (mut poller, _source, notifier) = poller(vec![
            Err(PollError::InvalidResponse(StatusCode::INTERNAL_SERVER_ERROR)),
            Err(PollError::InvalidResponse(StatusCode::INTERNAL_SERVER_ERROR)),
            Ok(json!({"current_date": 1000})),
        ]);

        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: true });
        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: false });
        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: true });

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("500"));
        assert!(sent[1].contains("нет ключа homeworks"));
    }

    #[tokio::test]
    async fn error_and_status_channels_are_debounced_separately() {
        let (mut poller, _source, notifier) = poller(vec![
            Ok(homework("hw1", "approved")),
            Err(PollError::MissingHomeworks),
            Ok(homework("hw1", "approved")),
            Err(PollError::MissingHomeworks),
        ]);

        assert_eq!(poller.poll_once().await, PollOutcome::Notified);
        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: true });
        assert_eq!(poller.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(poller.poll_once().await, PollOutcome::Failed { reported: false });
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn undelivered_message_is_retried() {
        let (mut poller, _source, notifier) =
            poller(vec![Ok(homework("hw1", "rejected")), Ok(homework("hw1", "rejected"))]);

        notifier.broken.store(true, Ordering::SeqCst);
        assert_eq!(poller.poll_once().await, PollOutcome::NotDelivered);

        notifier.broken.store(false, Ordering::SeqCst);
        assert_eq!(poller.poll_once().await, PollOutcome::Notified);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn only_the_most_recent_record_is_reported() {
        let (mut poller, _source, notifier) = poller(vec![Ok(json!({
            "homeworks": [
                {"homework_name": "hw2", "status": "reviewing"},
                {"homework_name": "hw1", "status": "unknown_status"}
            ],
            "current_date": 2000
        }))]);

        assert_eq!(poller.poll_once().await, PollOutcome::Notified);
        assert_eq!(poller.cursor(), 2000);
        assert!(notifier.sent()[0].contains("\"hw2\""));
    }

    #[tokio::test]
    async fn run_keeps_polling_after_failures() {
        let (mut poller, source, notifier) = poller(Vec::new());

        let handle = tokio::spawn(async move {
            poller.run(Duration::from_millis(10)).await;
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(source.requested().len() >= 2);
        assert_eq!(notifier.sent().len(), 1);
    }
}
