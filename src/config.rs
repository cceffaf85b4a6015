use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Key for password digests. Changing it invalidates every stored password.
    pub auth_secret: String,
    pub session_ttl_hours: i64,
    pub admin: Option<AdminAccount>,
}

/// Staff account created at startup if it does not exist yet.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminAccount {
                    name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barbershop.db".to_string()),
            auth_secret: env::var("AUTH_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(168),
            admin,
        }
    }
}
