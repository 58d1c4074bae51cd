// src/config.rs
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server Configuration
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,

    // Storage
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // JWT Authentication
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,

    // Rate Limiting
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    // PDF report assets; missing files are tolerated at render time
    #[serde(default = "default_watermark_path")]
    pub watermark_path: String,
    #[serde(default = "default_header_image_path")]
    pub header_image_path: String,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_database_url() -> String {
    "sqlite://novedades.db".to_string()
}

fn default_jwt_expiration_hours() -> u64 {
    8
}

fn default_rate_limit_requests() -> u32 {
    120
}

fn default_watermark_path() -> String {
    "assets/marca_agua.png".to_string()
}

fn default_header_image_path() -> String {
    "assets/encabezado.png".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        // Parse environment variables into Config struct
        envy::from_env::<Config>()
    }

    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}
