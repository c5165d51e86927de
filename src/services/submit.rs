use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use url::Url;

/// What came back from a form POST: the status and the URL the response was
/// finally served from (after any redirects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub url: String,
}

impl HttpReply {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub trait Transport: Send + Sync {
    fn post_form(&self, url: &Url, fields: &[(String, String)]) -> Result<HttpReply>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &Url, fields: &[(String, String)]) -> Result<HttpReply> {
        tracing::info!(%url, "POST");
        let resp = self
            .client
            .post(url.clone())
            .form(fields)
            .send()
            .with_context(|| format!("POST {url}"))?;
        let reply = HttpReply {
            status: resp.status().as_u16(),
            url: resp.url().to_string(),
        };
        tracing::info!(status = reply.status, url = %reply.url, "response");
        Ok(reply)
    }
}

pub fn http_timeout() -> Option<Duration> {
    match std::env::var("DIARYBOT_HTTP_TIMEOUT_SEC")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(Duration::from_secs(30)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitKind {
    Structured,
    Message,
}

#[derive(Debug)]
pub struct SubmitMsg {
    // page generation the request was made from; replies to an earlier page are dropped
    pub page: u64,
    pub kind: SubmitKind,
    pub outcome: Result<HttpReply, String>,
}

// Run one POST off the UI thread and report the reply (or transport error) back.
pub fn spawn_post_form(
    transport: Arc<dyn Transport>,
    url: Url,
    fields: Vec<(String, String)>,
    kind: SubmitKind,
    page: u64,
    tx: Sender<SubmitMsg>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let outcome = transport.post_form(&url, &fields).map_err(|e| {
            tracing::warn!(error = %format!("{e:#}"), %url, "POST failed");
            format!("{e:#}")
        });
        if let Err(lost) = tx.send(SubmitMsg {
            page,
            kind,
            outcome,
        }) {
            tracing::debug!(?kind, page, outcome = ?lost.0.outcome, %url, "reply dropped: receiver gone");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
        reply: HttpReply,
    }

    impl Transport for Recording {
        fn post_form(&self, url: &Url, fields: &[(String, String)]) -> Result<HttpReply> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), fields.to_vec()));
            Ok(self.reply.clone())
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn post_form(&self, url: &Url, _fields: &[(String, String)]) -> Result<HttpReply> {
            Err(anyhow::anyhow!("connection refused")).with_context(|| format!("POST {url}"))
        }
    }

    #[test]
    fn worker_reports_reply_with_kind() {
        let transport = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply: HttpReply {
                status: 200,
                url: "https://x/ok".into(),
            },
        });
        let (tx, rx) = mpsc::channel();
        let url = Url::parse("http://h/bot/structuredInput").unwrap();
        spawn_post_form(
            transport.clone(),
            url,
            vec![("kv".into(), "{\"k\":\"d\"}".into())],
            SubmitKind::Structured,
            3,
            tx,
        );
        let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(msg.kind, SubmitKind::Structured);
        assert_eq!(msg.page, 3);
        assert!(msg.outcome.unwrap().is_ok());
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].0, "http://h/bot/structuredInput");
        assert_eq!(seen[0].1, vec![("kv".to_string(), "{\"k\":\"d\"}".to_string())]);
    }

    #[test]
    fn worker_turns_transport_errors_into_strings() {
        let (tx, rx) = mpsc::channel();
        spawn_post_form(
            Arc::new(Unreachable),
            Url::parse("http://h/bot/message").unwrap(),
            vec![],
            SubmitKind::Message,
            0,
            tx,
        );
        let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let err = msg.outcome.unwrap_err();
        assert!(err.contains("connection refused"));
        assert!(err.contains("POST http://h/bot/message"));
    }

    #[test]
    fn worker_finishes_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let handle = spawn_post_form(
            Arc::new(Unreachable),
            Url::parse("http://h/bot/message").unwrap(),
            vec![],
            SubmitKind::Message,
            1,
            tx,
        );
        assert!(handle.join().is_ok());
    }

    #[test]
    fn only_200_counts_as_ok() {
        let r = |status| HttpReply {
            status,
            url: String::new(),
        };
        assert!(r(200).is_ok());
        assert!(!r(201).is_ok());
        assert!(!r(404).is_ok());
    }
}
