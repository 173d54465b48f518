use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    /// Echo the issued code back in the request response (demo delivery channel).
    pub expose_code: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub admin_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "rentals".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "rentals-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let otp = OtpConfig {
            ttl_minutes: env_parse("OTP_TTL_MINUTES").unwrap_or(5),
            expose_code: env_parse("OTP_EXPOSE_CODE").unwrap_or(true),
        };
        let admin_api_key = std::env::var("ADMIN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            database_url,
            max_db_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            otp,
            admin_api_key,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
