use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// `None` when SMTP_HOST is unset; the mailer then logs instead of sending.
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_USER").unwrap_or_default(),
                password: std::env::var("SMTP_PASS").unwrap_or_default(),
                from: std::env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@stayhub.local".into()),
            }),
            Err(_) => None,
        };
        Ok(Self { database_url, smtp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_is_optional() {
        let config = AppConfig {
            database_url: "postgres://localhost/stayhub".into(),
            smtp: None,
        };
        assert!(config.smtp.is_none());
    }
}
