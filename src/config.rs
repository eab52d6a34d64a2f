use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the S3-compatible media host. Present only when every
/// required key is set; otherwise profile pictures are served locally.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub tokeninfo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub jwt: JwtConfig,
    pub media: Option<MediaConfig>,
    pub gemini: Option<GeminiConfig>,
    pub google: GoogleConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "waypoint".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "waypoint-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60 * 24),
        };

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            jwt,
            media: media_from_env(),
            gemini: non_empty("GEMINI_API_KEY").map(|api_key| GeminiConfig {
                api_key,
                model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
                base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".into()
                }),
            }),
            google: GoogleConfig {
                client_id: non_empty("GOOGLE_CLIENT_ID"),
                tokeninfo_url: std::env::var("GOOGLE_TOKENINFO_URL")
                    .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".into()),
            },
        })
    }
}

fn media_from_env() -> Option<MediaConfig> {
    let endpoint = non_empty("MEDIA_ENDPOINT")?;
    let bucket = non_empty("MEDIA_BUCKET")?;
    let access_key = non_empty("MEDIA_ACCESS_KEY")?;
    let secret_key = non_empty("MEDIA_SECRET_KEY")?;
    let public_url = non_empty("MEDIA_PUBLIC_URL")
        .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
    Some(MediaConfig {
        region: std::env::var("MEDIA_REGION").unwrap_or_else(|_| "us-east-1".into()),
        public_url: public_url.trim_end_matches('/').to_string(),
        endpoint,
        bucket,
        access_key,
        secret_key,
    })
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
