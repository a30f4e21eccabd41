use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::fmt;

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const SUBSCRIBE_PATH: &str = "/subscribe";
pub const TICKET_PATH: &str = "/wsTicket";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// One-time credential that authorizes the real-time connection.
///
/// Sent byte-for-byte as the first frame; never trimmed or re-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Ticket(String);

impl Ticket {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket(<{} bytes>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    Rejected(StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    Refused(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    Granted(Ticket),
    Denied(StatusCode),
}

/// Body of a `/subscribe` reply. Only `ok: true` counts as an acknowledgement.
#[derive(Debug, Default, Deserialize)]
struct SubscribeResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The authentication service the client talks to.
///
/// `Err` is reserved for transport failures; refusals are outcomes.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn log_in(&self, credentials: &Credentials) -> Result<LoginOutcome>;
    async fn log_out(&self) -> Result<()>;
    async fn register(&self, registration: &Registration) -> Result<RegisterOutcome>;
    async fn ws_ticket(&self) -> Result<TicketOutcome>;
}

#[derive(Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: String,
}

impl HttpSessionApi {
    pub fn new(base_url: &str) -> Result<Self> {
        // The cookie store is what makes the session credential ride along on every call
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn log_in(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%status, username = %credentials.username, "login response");

        if status.is_success() {
            Ok(LoginOutcome::Accepted)
        } else {
            Ok(LoginOutcome::Rejected(status))
        }
    }

    async fn log_out(&self) -> Result<()> {
        let response = self.client.post(self.url(LOGOUT_PATH)).send().await?;
        tracing::debug!(status = %response.status(), "logout response");
        Ok(())
    }

    async fn register(&self, registration: &Registration) -> Result<RegisterOutcome> {
        let response = self
            .client
            .post(self.url(SUBSCRIBE_PATH))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(registration)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, username = %registration.username, "subscribe response");

        Ok(parse_subscribe_response(status, &body))
    }

    async fn ws_ticket(&self) -> Result<TicketOutcome> {
        let response = self.client.get(self.url(TICKET_PATH)).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "ticket denied");
            return Ok(TicketOutcome::Denied(status));
        }

        let body = response.text().await?;
        Ok(TicketOutcome::Granted(Ticket::new(body)))
    }
}

fn parse_subscribe_response(status: StatusCode, body: &str) -> RegisterOutcome {
    let parsed: Option<SubscribeResponse> = serde_json::from_str(body).ok();

    match parsed {
        Some(reply) if status.is_success() && reply.ok => RegisterOutcome::Registered,
        Some(reply) => {
            let reason = reply
                .message
                .filter(|m| !m.is_empty())
                .or(reply.error.filter(|m| !m.is_empty()))
                .unwrap_or_else(|| format!("Registration failed ({})", status));
            RegisterOutcome::Refused(reason)
        }
        None => RegisterOutcome::Refused(format!("Registration failed ({})", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn response(status: &str, headers: &[&str], body: &str) -> String {
        let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
        for header in headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serve one canned response per connection, returning the raw requests seen
    async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for reply in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });

        (format!("http://{}", addr), handle)
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "alice".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn test_login_posts_json_and_maps_status() {
        let (url, server) = serve(vec![
            response("200 OK", &[], ""),
            response("401 Unauthorized", &[], ""),
        ])
        .await;
        let api = HttpSessionApi::new(&url).unwrap();

        assert_eq!(api.log_in(&credentials()).await.unwrap(), LoginOutcome::Accepted);
        assert_eq!(
            api.log_in(&credentials()).await.unwrap(),
            LoginOutcome::Rejected(StatusCode::UNAUTHORIZED)
        );

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /login HTTP/1.1"));
        assert!(requests[0].contains(r#"{"username":"alice","password":"secret"}"#));
    }

    #[tokio::test]
    async fn test_session_cookie_is_sent_with_ticket_request() {
        let (url, server) = serve(vec![
            response("200 OK", &["Set-Cookie: sid=abc123; Path=/"], ""),
            response("200 OK", &["Content-Type: text/plain"], "ticket-42\n"),
        ])
        .await;
        let api = HttpSessionApi::new(&url).unwrap();

        api.log_in(&credentials()).await.unwrap();
        let outcome = api.ws_ticket().await.unwrap();
        assert_eq!(outcome, TicketOutcome::Granted(Ticket::new("ticket-42\n")));

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /wsTicket HTTP/1.1"));
        assert!(requests[1].to_lowercase().contains("cookie: sid=abc123"));
    }

    #[tokio::test]
    async fn test_ticket_denied() {
        let (url, _server) = serve(vec![response("403 Forbidden", &[], "nope")]).await;
        let api = HttpSessionApi::new(&url).unwrap();

        assert_eq!(
            api.ws_ticket().await.unwrap(),
            TicketOutcome::Denied(StatusCode::FORBIDDEN)
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpSessionApi::new(&format!("http://{}", addr)).unwrap();
        assert!(api.ws_ticket().await.is_err());
    }

    #[test]
    fn test_subscribe_requires_ok_flag() {
        assert_eq!(
            parse_subscribe_response(StatusCode::OK, r#"{"ok":true}"#),
            RegisterOutcome::Registered
        );
        assert_eq!(
            parse_subscribe_response(StatusCode::OK, r#"{"ok":false,"message":"Username taken"}"#),
            RegisterOutcome::Refused("Username taken".into())
        );
        assert_eq!(
            parse_subscribe_response(StatusCode::OK, "{}"),
            RegisterOutcome::Refused("Registration failed (200 OK)".into())
        );
    }

    #[test]
    fn test_subscribe_error_status_wins_over_ok_flag() {
        assert_eq!(
            parse_subscribe_response(StatusCode::CONFLICT, r#"{"ok":true,"error":"exists"}"#),
            RegisterOutcome::Refused("exists".into())
        );
        assert_eq!(
            parse_subscribe_response(StatusCode::BAD_GATEWAY, "<html>"),
            RegisterOutcome::Refused("Registration failed (502 Bad Gateway)".into())
        );
    }

    #[test]
    fn test_subscribe_skips_empty_message_for_error() {
        assert_eq!(
            parse_subscribe_response(
                StatusCode::OK,
                r#"{"ok":false,"message":"","error":"Username taken"}"#
            ),
            RegisterOutcome::Refused("Username taken".into())
        );
    }

    #[test]
    fn test_ticket_debug_is_redacted() {
        let ticket = Ticket::new("super-secret");
        assert_eq!(format!("{:?}", ticket), "Ticket(<12 bytes>)");
    }
}
