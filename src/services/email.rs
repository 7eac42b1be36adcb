// src/services/email.rs
//! SMTP delivery and HTML templates for outgoing notifications

use html_escape::encode_text;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::env;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::common::safe_email_log;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid email address: {0}")]
    Address(String),
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpConfig {
    /// Reads `SMTP_*` variables. `Ok(None)` when `SMTP_HOST` is unset.
    pub fn from_env() -> Result<Option<Self>, EmailError> {
        let host = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => host,
            _ => return Ok(None),
        };

        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".into())
            .parse()
            .map_err(|_| EmailError::Config("SMTP_PORT must be a valid port number".into()))?;

        let from_address = env::var("SMTP_FROM_ADDRESS")
            .map_err(|_| EmailError::Config("SMTP_FROM_ADDRESS is required".into()))?;

        Ok(Some(Self {
            host,
            port,
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from_address,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Homebase".into()),
            use_tls: env::var("SMTP_USE_TLS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }))
    }
}

struct SmtpClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

/// Sends multipart (text + HTML) mail. Without SMTP configuration every send
/// is skipped and reported as not delivered.
pub struct EmailService {
    client: Option<SmtpClient>,
}

impl EmailService {
    pub fn new(config: Option<SmtpConfig>) -> Result<Self, EmailError> {
        let Some(config) = config else {
            info!("SMTP not configured; outgoing email disabled");
            return Ok(Self::disabled());
        };

        let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| EmailError::Address(format!("{e}")))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::Connection(format!("{e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        info!(host = %config.host, port = config.port, "EmailService initialized");

        Ok(Self {
            client: Some(SmtpClient {
                transport: builder.build(),
                from_mailbox,
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Returns `Ok(false)` when email is disabled
    pub async fn send(&self, to: &str, email: &RenderedEmail) -> Result<bool, EmailError> {
        let Some(client) = &self.client else {
            debug!(to = %safe_email_log(to), "Email disabled, skipping send");
            return Ok(false);
        };

        let to_mailbox: Mailbox = to.parse().map_err(|e| EmailError::Address(format!("{e}")))?;

        let message = Message::builder()
            .from(client.from_mailbox.clone())
            .to(to_mailbox)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| EmailError::Send(format!("failed to build message: {e}")))?;

        client
            .transport
            .send(message)
            .await
            .map_err(|e| EmailError::Send(format!("{e}")))?;

        info!(to = %safe_email_log(to), subject = %email.subject, "Email sent");
        Ok(true)
    }
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn layout(heading: &str, body_html: &str, action_url: &str, action_label: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #4F46E5; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{}</h1>
        </div>
        <div class="content">
            {}
            <p><a class="button" href="{}">{}</a></p>
        </div>
        <div class="footer">
            <p>This is an automated message from Homebase.</p>
        </div>
    </div>
</body>
</html>"#,
        encode_text(heading),
        body_html,
        html_escape::encode_double_quoted_attribute(action_url),
        encode_text(action_label),
    )
}

/// A time slot as shown in emails, already formatted for display
pub struct SlotLine {
    pub start: String,
    pub end: String,
}

pub fn schedule_request_email(
    sender_name: &str,
    title: &str,
    message: Option<&str>,
    slots: &[SlotLine],
    app_url: &str,
) -> RenderedEmail {
    let slot_items: String = slots
        .iter()
        .map(|s| format!("<li>{} &ndash; {}</li>", encode_text(&s.start), encode_text(&s.end)))
        .collect();
    let slot_text: String = slots
        .iter()
        .map(|s| format!("  - {} - {}\n", s.start, s.end))
        .collect();

    let message_html = message
        .filter(|m| !m.trim().is_empty())
        .map(|m| format!("<p><em>{}</em></p>", encode_text(m)))
        .unwrap_or_default();

    let url = format!("{}/dashboard#schedule", app_url);
    let body = format!(
        "<p><strong>{}</strong> would like to schedule <strong>{}</strong>.</p>{}<p>Proposed times:</p><ul>{}</ul>",
        encode_text(sender_name),
        encode_text(title),
        message_html,
        slot_items,
    );

    RenderedEmail {
        subject: format!("{} wants to schedule: {}", sender_name, title),
        html: layout("New schedule request", &body, &url, "Choose a time"),
        text: format!(
            "{} would like to schedule \"{}\".\n{}\nProposed times:\n{}\nRespond at {}\n",
            sender_name,
            title,
            message.unwrap_or(""),
            slot_text,
            url
        ),
    }
}

pub fn schedule_accepted_email(
    recipient_name: &str,
    title: &str,
    slot: &SlotLine,
    app_url: &str,
) -> RenderedEmail {
    let url = format!("{}/dashboard", app_url);
    let body = format!(
        "<p><strong>{}</strong> accepted <strong>{}</strong>.</p><p>{} &ndash; {}</p><p>It has been added to both calendars.</p>",
        encode_text(recipient_name),
        encode_text(title),
        encode_text(&slot.start),
        encode_text(&slot.end),
    );

    RenderedEmail {
        subject: format!("Accepted: {}", title),
        html: layout("Schedule request accepted", &body, &url, "Open calendar"),
        text: format!(
            "{} accepted \"{}\".\n{} - {}\nIt has been added to both calendars.\n",
            recipient_name, title, slot.start, slot.end
        ),
    }
}

pub fn event_reminder_email(title: &str, starts_at: &str, location: Option<&str>, app_url: &str) -> RenderedEmail {
    let url = format!("{}/dashboard", app_url);
    let location_html = location
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("<p>Where: {}</p>", encode_text(l)))
        .unwrap_or_default();
    let body = format!(
        "<p><strong>{}</strong> starts at {}.</p>{}",
        encode_text(title),
        encode_text(starts_at),
        location_html
    );

    RenderedEmail {
        subject: format!("Reminder: {}", title),
        html: layout("Upcoming event", &body, &url, "Open calendar"),
        text: format!(
            "Reminder: \"{}\" starts at {}.{}\n",
            title,
            starts_at,
            location.map(|l| format!(" Where: {}", l)).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_request_email_escapes_user_content() {
        let email = schedule_request_email(
            "<b>Sam</b>",
            "Dinner & a movie",
            Some("<script>alert(1)</script>"),
            &[SlotLine {
                start: "Fri 7:00 PM".into(),
                end: "Fri 9:00 PM".into(),
            }],
            "https://home.example",
        );

        assert!(email.html.contains("&lt;b&gt;Sam&lt;/b&gt;"));
        assert!(email.html.contains("Dinner &amp; a movie"));
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("https://home.example/dashboard#schedule"));
        assert!(email.text.contains("Fri 7:00 PM - Fri 9:00 PM"));
        assert_eq!(email.subject, "<b>Sam</b> wants to schedule: Dinner & a movie");
    }

    #[test]
    fn test_config_debug_does_not_leak_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: Some("user".into()),
            password: Some("super-secret-password".into()),
            from_address: "noreply@example.com".into(),
            from_name: "Homebase".into(),
            use_tls: true,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-password"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_disabled_service_reports_not_sent() {
        let service = EmailService::disabled();
        let email = event_reminder_email("Dentist", "10:00", None, "http://localhost:8080");
        assert!(!service.send("a@example.com", &email).await.unwrap());
    }
}
