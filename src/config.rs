use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub market: MarketConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "stockpulse".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "stockpulse-users".into()),
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let google = GoogleConfig {
            userinfo_url: std::env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/userinfo".into()),
        };
        let market = MarketConfig {
            base_url: std::env::var("MARKET_API_URL")?,
            api_key: std::env::var("MARKET_API_KEY")?,
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL")?,
            api_key: std::env::var("MAIL_API_KEY")?,
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@stockpulse.app".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            google,
            market,
            mail,
        })
    }
}
