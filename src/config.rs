use std::env;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub port: u16,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(6501);

        let rate_limit_max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(100);

        // Default window: 15 minutes
        let rate_limit_window_secs = env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(900);

        Config {
            database_url,
            frontend_origin,
            port,
            rate_limit_max_requests,
            rate_limit_window_secs,
        }
    }
}
