use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Rules applied by the user service to account state.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPolicy {
    /// Consecutive failed logins after which an account is locked.
    pub max_login_attempts: i32,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL used for response links and verification emails.
    pub server_base_url: String,
    pub jwt: JwtConfig,
    pub accounts: AccountPolicy,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server_base_url = std::env::var("SERVER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "user-management".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "user-management-api".into()),
            ttl_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES").unwrap_or(30),
        };
        let accounts = AccountPolicy {
            max_login_attempts: env_parse("MAX_LOGIN_ATTEMPTS")
                .unwrap_or(AccountPolicy::default().max_login_attempts),
        };
        let mail = MailConfig {
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@example.com".into()),
        };
        Ok(Self {
            database_url,
            server_base_url,
            jwt,
            accounts,
            mail,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
