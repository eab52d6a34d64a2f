use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::{
        google::{GoogleVerifier, IdentityVerifier},
        jwt::JwtKeys,
        repo::{PgUserRepo, UserRepo},
    },
    config::AppConfig,
    itinerary::{gemini::GeminiGenerator, ItineraryDrafter, ItineraryGenerator},
    profiles::repo::{PgProfileRepo, ProfileRepo},
    storage::{Storage, StorageClient},
    trips::repo::{PgTripRepo, TripRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub trips: Arc<dyn TripRepo>,
    /// Remote picture host; `None` serves pictures from the upload dir.
    pub media: Option<Arc<dyn StorageClient>>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub itinerary: ItineraryDrafter,
}

impl AppState {
    pub async fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let media = match &config.media {
            Some(cfg) => {
                let storage = Storage::new(cfg).await?;
                info!(endpoint = %cfg.endpoint, bucket = %cfg.bucket, "media host configured");
                Some(Arc::new(storage) as Arc<dyn StorageClient>)
            }
            None => {
                warn!(upload_dir = %config.upload_dir, "media host not configured; serving pictures locally");
                None
            }
        };

        let generator = match config.gemini.clone() {
            Some(cfg) => Some(Arc::new(GeminiGenerator::new(cfg)?) as Arc<dyn ItineraryGenerator>),
            None => {
                warn!("GEMINI_API_KEY not set; trips get the fallback itinerary");
                None
            }
        };

        if config.google.client_id.is_none() {
            warn!("GOOGLE_CLIENT_ID not set; google login will reject every token");
        }
        let identity = Arc::new(GoogleVerifier::new(&config.google)?);

        Ok(Self {
            jwt: JwtKeys::new(&config.jwt),
            users: Arc::new(PgUserRepo::new(db.clone())),
            profiles: Arc::new(PgProfileRepo::new(db.clone())),
            trips: Arc::new(PgTripRepo::new(db)),
            media,
            identity,
            itinerary: ItineraryDrafter::new(generator),
            config: Arc::new(config),
        })
    }
}
