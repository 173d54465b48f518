use axum::async_trait;
use tracing::info;

/// Delivery channel for one-time codes.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, country_code: &str, phone: &str, code: &str) -> anyhow::Result<()>;
}

/// Stand-in for an SMS gateway: writes the code to the log.
#[derive(Clone, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, country_code: &str, phone: &str, code: &str) -> anyhow::Result<()> {
        info!(%country_code, %phone, %code, "otp issued");
        Ok(())
    }
}
