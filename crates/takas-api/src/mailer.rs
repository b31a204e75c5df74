//! Outbound transactional email.
//!
//! Production uses the Resend HTTP API. Without an API key the server falls
//! back to [`LogMailer`], which only logs what would have been sent.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const APP_NAME: &str = "Beyler Bi' Dal?";

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: Email) -> Result<()> {
        let payload = ResendPayload {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let resp = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Resend request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Resend rejected email ({}): {}", status, body);
        }

        info!("Email '{}' sent to {}", email.subject, email.to);
        Ok(())
    }
}

/// Used when no email provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        info!(
            "Email sending disabled, would send '{}' to {}",
            email.subject, email.to
        );
        Ok(())
    }
}

/// Keeps every sent email in memory. Lets tests follow emailed links.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<Email> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|email| email.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<()> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

// -- Templates --

fn layout(greeting_name: &str, body: &str) -> String {
    format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; line-height: 1.6;">
    <h2>Merhaba {name},</h2>
    {body}
    <p>Teşekkürler,<br/>{APP_NAME} Ekibi</p>
  </body>
</html>"#,
        name = ammonia::clean_text(greeting_name),
    )
}

fn button(link: &str, label: &str) -> String {
    format!(
        r#"<p><a href="{link}" style="display: inline-block; padding: 10px 15px; background-color: #007bff; color: #ffffff; text-decoration: none; border-radius: 5px;">{label}</a></p>"#
    )
}

pub fn verification_email(to: &str, name: &str, link: &str) -> Email {
    let body = format!(
        "<p>{APP_NAME} hesabınızı etkinleştirmek için e-posta adresinizi doğrulayın. Bağlantı 24 saat geçerlidir.</p>\n    {}",
        button(link, "E-postamı Doğrula")
    );
    Email {
        to: to.to_string(),
        subject: format!("{APP_NAME} - E-posta adresinizi doğrulayın"),
        html: layout(name, &body),
    }
}

pub fn password_reset_email(to: &str, name: &str, link: &str) -> Email {
    let body = format!(
        "<p>Şifrenizi sıfırlamak için aşağıdaki bağlantıyı kullanın. Bağlantı 1 saat geçerlidir. Bu isteği siz yapmadıysanız bu e-postayı yok sayabilirsiniz.</p>\n    {}",
        button(link, "Şifremi Sıfırla")
    );
    Email {
        to: to.to_string(),
        subject: format!("{APP_NAME} - Şifre sıfırlama"),
        html: layout(name, &body),
    }
}

/// Notifies an ad owner that someone answered their ad.
pub fn new_response_email(
    to: &str,
    owner_name: &str,
    responder_name: &str,
    ad_requested: &str,
    response_message: &str,
    activity_link: &str,
) -> Email {
    let body = format!(
        r#"<p><strong>{responder}</strong> adlı kullanıcı, "<strong>{requested}</strong>" başlıklı ilanınıza yeni bir yanıt gönderdi.</p>
    <p><strong>Yanıtı:</strong></p>
    <blockquote style="border-left: 4px solid #ccc; padding-left: 1em; margin-left: 0;">
      <p>{message}</p>
    </blockquote>
    <p>Yanıtı ve diğer ilan hareketlerinizi görmek için aşağıdaki bağlantıyı ziyaret edebilirsiniz:</p>
    {button}"#,
        responder = ammonia::clean_text(responder_name),
        requested = ammonia::clean_text(ad_requested),
        message = ammonia::clean_text(response_message),
        button = button(activity_link, "Hareketlerimi Görüntüle"),
    );
    Email {
        to: to.to_string(),
        subject: format!("Yeni Bir Takas Yanıtı Aldınız: {ad_requested}"),
        html: layout(owner_name, &body),
    }
}
