//! Error-volume alerting.
//!
//! The manager is a two-state machine evaluated once per invocation:
//!
//! ```text
//!   Normal  --(errors > threshold / notify once)-->  Alerting
//!   Alerting --(errors > threshold)-->               Alerting
//!   Alerting --(errors <= threshold)-->              Normal
//! ```
//!
//! A notification is attempted only on `Normal -> Alerting`, so a sustained
//! incident produces one message per episode.

use crate::error::NotifyError;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_ERROR_THRESHOLD: u64 = 1000;

/// Outbound alert transport.
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str, error_count: u64) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Normal,
    Alerting,
}

/// What happened to the state machine on one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertTransition {
    StayedNormal,
    /// Entered `Alerting`; carries the outcome of the single delivery attempt.
    Fired(Result<(), NotifyError>),
    Sustained,
    Cleared,
}

#[derive(Debug)]
pub struct AlertManager {
    threshold: u64,
    state: AlertState,
    notified: bool,
    last_delivery: Option<Result<(), NotifyError>>,
}

impl AlertManager {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            state: AlertState::Normal,
            notified: false,
            last_delivery: None,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Whether a notification was attempted in the current episode.
    pub fn notified(&self) -> bool {
        self.notified
    }

    pub fn last_delivery(&self) -> Option<&Result<(), NotifyError>> {
        self.last_delivery.as_ref()
    }

    pub fn evaluate(&mut self, error_count: u64, notifier: &dyn Notifier) -> AlertTransition {
        let above = error_count > self.threshold;

        match (self.state, above) {
            (AlertState::Normal, false) => AlertTransition::StayedNormal,
            (AlertState::Normal, true) => {
                // Commit the transition before talking to the notifier.
                self.state = AlertState::Alerting;
                self.notified = true;

                let subject = "ALERT: High number of ERROR logs";
                let body = format!(
                    "{} ERROR logs observed, above the threshold of {}.",
                    error_count, self.threshold
                );
                let delivery = notifier.notify(subject, &body, error_count);
                match &delivery {
                    Ok(()) => log::info!("alert delivered for {} ERROR logs", error_count),
                    Err(e) => log::warn!("alert delivery failed: {}", e),
                }
                self.last_delivery = Some(delivery.clone());
                AlertTransition::Fired(delivery)
            }
            (AlertState::Alerting, true) => {
                log::debug!("alert sustained ({} ERROR logs), not re-notifying", error_count);
                AlertTransition::Sustained
            }
            (AlertState::Alerting, false) => {
                self.state = AlertState::Normal;
                self.notified = false;
                log::info!("error volume back to normal ({} ERROR logs)", error_count);
                AlertTransition::Cleared
            }
        }
    }

    /// Operator-facing status line for the current state.
    pub fn status_line(&self, error_count: u64) -> String {
        match self.state {
            AlertState::Alerting => format!("ALERT: High number of ERROR logs ({})", error_count),
            AlertState::Normal => "System stable. ERROR logs normal.".to_string(),
        }
    }
}

/// Writes alerts to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str, _error_count: u64) -> Result<(), NotifyError> {
        log::warn!("{}: {}", subject, body);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
    error_count: u64,
}

/// POSTs alerts as JSON to a webhook with a bounded timeout.
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, subject: &str, body: &str, error_count: u64) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            subject,
            body,
            error_count,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout {
                        millis: self.timeout.as_millis() as u64,
                    }
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Instant;

    /// Records every call; optionally fails each one.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub calls: RefCell<Vec<u64>>,
        pub fail_with: Option<NotifyError>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, _subject: &str, _body: &str, error_count: u64) -> Result<(), NotifyError> {
            self.calls.borrow_mut().push(error_count);
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn below_threshold_never_notifies() {
        let notifier = RecordingNotifier::default();
        let mut alerts = AlertManager::new(5);

        assert_eq!(alerts.evaluate(3, &notifier), AlertTransition::StayedNormal);
        assert_eq!(alerts.evaluate(5, &notifier), AlertTransition::StayedNormal);
        assert_eq!(alerts.state(), AlertState::Normal);
        assert!(notifier.calls.borrow().is_empty());
    }

    #[test]
    fn sustained_episode_notifies_once() {
        let notifier = RecordingNotifier::default();
        let mut alerts = AlertManager::new(1000);

        assert_eq!(alerts.evaluate(1200, &notifier), AlertTransition::Fired(Ok(())));
        assert_eq!(alerts.evaluate(1200, &notifier), AlertTransition::Sustained);
        assert_eq!(alerts.evaluate(1500, &notifier), AlertTransition::Sustained);

        assert_eq!(*notifier.calls.borrow(), vec![1200]);
        assert_eq!(alerts.state(), AlertState::Alerting);
        assert!(alerts.notified());
    }

    #[test]
    fn dip_and_rise_starts_a_new_episode() {
        let notifier = RecordingNotifier::default();
        let mut alerts = AlertManager::new(10);

        alerts.evaluate(11, &notifier);
        assert_eq!(alerts.evaluate(10, &notifier), AlertTransition::Cleared);
        assert!(!alerts.notified());
        assert_eq!(alerts.evaluate(20, &notifier), AlertTransition::Fired(Ok(())));

        assert_eq!(*notifier.calls.borrow(), vec![11, 20]);
    }

    #[test]
    fn delivery_failure_keeps_the_transition() {
        let notifier = RecordingNotifier {
            fail_with: Some(NotifyError::Timeout { millis: 5000 }),
            ..Default::default()
        };
        let mut alerts = AlertManager::new(0);

        let t = alerts.evaluate(1, &notifier);
        assert_eq!(t, AlertTransition::Fired(Err(NotifyError::Timeout { millis: 5000 })));
        assert_eq!(alerts.state(), AlertState::Alerting);
        assert_eq!(
            alerts.last_delivery(),
            Some(&Err(NotifyError::Timeout { millis: 5000 }))
        );

        // No retry while the episode lasts.
        assert_eq!(alerts.evaluate(2, &notifier), AlertTransition::Sustained);
        assert_eq!(notifier.calls.borrow().len(), 1);
    }

    #[test]
    fn status_line_tracks_state() {
        let notifier = RecordingNotifier::default();
        let mut alerts = AlertManager::new(1);
        assert_eq!(alerts.status_line(0), "System stable. ERROR logs normal.");
        alerts.evaluate(7, &notifier);
        assert_eq!(alerts.status_line(7), "ALERT: High number of ERROR logs (7)");
    }

    #[test]
    fn unreachable_webhook_is_a_delivery_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(500)).unwrap();
        let mut alerts = AlertManager::new(0);

        match alerts.evaluate(3, &notifier) {
            AlertTransition::Fired(Err(_)) => {}
            other => panic!("expected failed delivery, got {:?}", other),
        }
        assert_eq!(alerts.state(), AlertState::Alerting);
    }

    #[test]
    fn silent_webhook_times_out_within_the_bound() {
        // Accepts the connection and reads the request, never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                }
            }
        });

        let timeout = Duration::from_millis(300);
        let notifier = WebhookNotifier::new(format!("http://{}/hook", addr), timeout).unwrap();

        let started = Instant::now();
        let result = notifier.notify("subject", "body", 3);
        let elapsed = started.elapsed();

        assert_eq!(result, Err(NotifyError::Timeout { millis: 300 }));
        assert!(elapsed >= timeout, "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
        assert_eq!(
            result.unwrap_err().to_string(),
            "notifier timed out after 300ms"
        );
    }
}
