//! In-memory collaborators and a request driver for router tests.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        claims::DEFAULT_ROLE,
        google::{ExternalIdentity, IdentityVerifier},
        jwt::JwtKeys,
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    config::{AppConfig, GoogleConfig, JwtConfig},
    db::RepoError,
    itinerary::{ItineraryDrafter, ItineraryGenerator, TripParams},
    profiles::{
        repo::ProfileRepo,
        repo_types::{Profile, ProfileFields},
    },
    state::AppState,
    storage::{key_under_base, StorageClient},
    trips::{
        repo::TripRepo,
        repo_types::{Trip, TripFields},
    },
};

const MEDIA_BASE: &str = "https://media.test";
const TEST_HOST: &str = "waypoint.test";
const BOUNDARY: &str = "waypoint-test-boundary";

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned()
    }

    pub fn remove(&self, id: Uuid) {
        self.rows.lock().unwrap().retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserRepo for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.get_by_email(email))
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            role: DEFAULT_ROLE.into(),
            google_id: new.google_id,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn link_google(&self, id: Uuid, google_id: &str) -> anyhow::Result<()> {
        if let Some(user) = self.rows.lock().unwrap().iter_mut().find(|u| u.id == id) {
            user.google_id = Some(google_id.into());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    rows: Mutex<Vec<Profile>>,
}

impl InMemoryProfiles {
    fn with_owned<T>(&self, id: Uuid, user_id: Uuid, f: impl FnOnce(&mut Profile) -> T) -> Option<T> {
        self.rows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .map(f)
    }
}

#[async_trait]
impl ProfileRepo for InMemoryProfiles {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.rows.lock().unwrap().iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.with_owned(id, user_id, |p| p.clone()))
    }

    async fn create(&self, user_id: Uuid, fields: ProfileFields) -> Result<Profile, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|p| p.user_id == user_id) {
            return Err(RepoError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id,
            name: fields.name,
            age: fields.age,
            gender: fields.gender,
            citizen: fields.citizen,
            profile_pict: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(profile.clone());
        Ok(profile)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        fields: ProfileFields,
    ) -> anyhow::Result<Option<Profile>> {
        Ok(self.with_owned(id, user_id, |p| {
            p.name = fields.name;
            p.age = fields.age;
            p.gender = fields.gender;
            p.citizen = fields.citizen;
            p.updated_at = OffsetDateTime::now_utc();
            p.clone()
        }))
    }

    async fn set_picture(
        &self,
        id: Uuid,
        user_id: Uuid,
        url: &str,
    ) -> anyhow::Result<Option<Profile>> {
        Ok(self.with_owned(id, user_id, |p| {
            p.profile_pict = Some(url.into());
            p.updated_at = OffsetDateTime::now_utc();
            p.clone()
        }))
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(rows.len() != before)
    }
}

/// Rows kept in insertion order; listing walks them backwards.
#[derive(Default)]
pub struct InMemoryTrips {
    rows: Mutex<Vec<Trip>>,
}

#[async_trait]
impl TripRepo for InMemoryTrips {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Trip>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Trip>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn create(&self, user_id: Uuid, f: TripFields) -> anyhow::Result<Trip> {
        let now = OffsetDateTime::now_utc();
        let trip = Trip {
            id: Uuid::new_v4(),
            user_id,
            title: f.title,
            country: f.country,
            city: f.city,
            departure_date: f.departure_date,
            duration: f.duration,
            budget_level: f.budget_level,
            itinerary: f.itinerary,
            status: f.status,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(trip.clone());
        Ok(trip)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
        f: TripFields,
    ) -> anyhow::Result<Option<Trip>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(t) = rows.iter_mut().find(|t| t.id == id && t.user_id == user_id) else {
            return Ok(None);
        };
        t.title = f.title;
        t.country = f.country;
        t.city = f.city;
        t.departure_date = f.departure_date;
        t.duration = f.duration;
        t.budget_level = f.budget_level;
        t.itinerary = f.itinerary;
        t.status = f.status;
        t.updated_at = OffsetDateTime::now_utc();
        Ok(Some(t.clone()))
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(rows.len() != before)
    }
}

/// Media host that records what it was asked to do.
#[derive(Default)]
pub struct FakeStorage {
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl FakeStorage {
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn fail_puts(&self) {
        *self.failing.lock().unwrap() = true;
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap() {
            anyhow::bail!("media host unreachable");
        }
        self.puts.lock().unwrap().push(key.into());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.deletes.lock().unwrap().push(key.into());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{MEDIA_BASE}/{key}")
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        key_under_base(MEDIA_BASE, url)
    }
}

pub struct ScriptedIdentity {
    next: Mutex<Result<ExternalIdentity, String>>,
}

impl Default for ScriptedIdentity {
    fn default() -> Self {
        Self {
            next: Mutex::new(Err("no identity scripted".into())),
        }
    }
}

impl ScriptedIdentity {
    pub fn respond_with(&self, result: Result<ExternalIdentity, String>) {
        *self.next.lock().unwrap() = result;
    }
}

#[async_trait]
impl IdentityVerifier for ScriptedIdentity {
    async fn verify(&self, _id_token: &str) -> anyhow::Result<ExternalIdentity> {
        self.next.lock().unwrap().clone().map_err(anyhow::Error::msg)
    }
}

pub struct ScriptedGenerator {
    next: Mutex<Result<String, String>>,
    prompts: Mutex<Vec<TripParams>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self {
            next: Mutex::new(Ok("# Generated itinerary".into())),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedGenerator {
    pub fn respond_with(&self, result: Result<String, String>) {
        *self.next.lock().unwrap() = result;
    }

    pub fn prompts(&self) -> Vec<TripParams> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItineraryGenerator for ScriptedGenerator {
    async fn generate(&self, params: &TripParams) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(params.clone());
        self.next.lock().unwrap().clone().map_err(anyhow::Error::msg)
    }
}

/// Handles to the in-memory collaborators behind a fake [`AppState`].
pub struct Fakes {
    pub users: Arc<InMemoryUsers>,
    pub media: Arc<FakeStorage>,
    pub identity: Arc<ScriptedIdentity>,
    pub generator: Arc<ScriptedGenerator>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn fake() -> (Self, Fakes) {
        let upload_dir = std::env::temp_dir().join(format!("waypoint-uploads-{}", Uuid::new_v4()));
        let config = AppConfig {
            database_url: "postgres://unused".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "waypoint".into(),
                audience: "waypoint-users".into(),
                ttl_minutes: 60,
            },
            media: None,
            gemini: None,
            google: GoogleConfig {
                client_id: Some("test-client".into()),
                tokeninfo_url: "http://127.0.0.1:9/tokeninfo".into(),
            },
        };

        let fakes = Fakes {
            users: Arc::new(InMemoryUsers::default()),
            media: Arc::new(FakeStorage::default()),
            identity: Arc::new(ScriptedIdentity::default()),
            generator: Arc::new(ScriptedGenerator::default()),
            upload_dir,
        };

        let state = Self {
            jwt: JwtKeys::new(&config.jwt),
            users: fakes.users.clone(),
            profiles: Arc::new(InMemoryProfiles::default()),
            trips: Arc::new(InMemoryTrips::default()),
            media: Some(fakes.media.clone() as Arc<dyn StorageClient>),
            identity: fakes.identity.clone(),
            itinerary: ItineraryDrafter::new(Some(
                fakes.generator.clone() as Arc<dyn ItineraryGenerator>
            )),
            config: Arc::new(config),
        };
        (state, fakes)
    }
}

/// One multipart file part.
pub struct Upload<'a> {
    field: &'a str,
    content_type: &'a str,
    bytes: &'a [u8],
}

impl<'a> Upload<'a> {
    pub fn file(field: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            field,
            content_type,
            bytes,
        }
    }
}

fn multipart_body(upload: Option<Upload<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    match upload {
        Some(u) => {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                    u.field, u.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(u.bytes);
        }
        None => body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello")
                .as_bytes(),
        ),
    }
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// The real router over a fake [`AppState`].
pub struct TestApp {
    router: Router,
    pub users: Arc<InMemoryUsers>,
    pub media: Arc<FakeStorage>,
    pub identity: Arc<ScriptedIdentity>,
    pub generator: Arc<ScriptedGenerator>,
    upload_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        let (state, fakes) = AppState::fake();
        Self::from_parts(state, fakes)
    }

    /// No media host: pictures are served from the upload dir.
    pub fn without_media() -> Self {
        let (mut state, fakes) = AppState::fake();
        state.media = None;
        Self::from_parts(state, fakes)
    }

    fn from_parts(state: AppState, fakes: Fakes) -> Self {
        Self {
            router: build_app(state),
            users: fakes.users,
            media: fakes.media,
            identity: fakes.identity,
            generator: fakes.generator,
            upload_dir: fakes.upload_dir,
        }
    }

    /// Files currently sitting in the upload dir.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Bytes) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    async fn send_json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(req).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
        };
        (status, value)
    }

    fn request(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, TEST_HOST);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    async fn json_request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let req = Self::request(method, path, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(req).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::GET, path, token).body(Body::empty()).unwrap();
        self.send_json(req).await
    }

    pub async fn get_raw(&self, path: &str) -> (StatusCode, Bytes) {
        let req = Self::request(Method::GET, path, None).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn get_with_auth_header(&self, path: &str, raw: &str) -> (StatusCode, Value) {
        let req = Self::request(Method::GET, path, None)
            .header(header::AUTHORIZATION, raw)
            .body(Body::empty())
            .unwrap();
        self.send_json(req).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json_request(Method::POST, path, token, body).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json_request(Method::PUT, path, token, body).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::DELETE, path, token).body(Body::empty()).unwrap();
        self.send_json(req).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let req = Self::request(Method::POST, path, None)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(req).await
    }

    pub async fn post_with_header(&self, path: &str, name: &str, value: &str) -> (StatusCode, Value) {
        let req = Self::request(Method::POST, path, None)
            .header(name, value)
            .body(Body::empty())
            .unwrap();
        self.send_json(req).await
    }

    /// PATCH a multipart form; `None` sends a form without a file part.
    pub async fn upload(
        &self,
        path: &str,
        token: Option<&str>,
        upload: Option<Upload<'_>>,
    ) -> (StatusCode, Value) {
        self.upload_with_host(path, token, upload, TEST_HOST).await
    }

    pub async fn upload_with_host(
        &self,
        path: &str,
        token: Option<&str>,
        upload: Option<Upload<'_>>,
        host: &str,
    ) -> (StatusCode, Value) {
        let mut req = Self::request(Method::PATCH, path, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(upload)))
            .unwrap();
        req.headers_mut()
            .insert(header::HOST, header::HeaderValue::from_str(host).unwrap());
        self.send_json(req).await
    }

    pub async fn register(&self, email: &str, password: &str) {
        let (status, body) = self
            .post("/register", None, json!({"email": email, "password": password}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    /// Registers `email` with a fixed password and returns an access token.
    pub async fn register_and_login(&self, email: &str) -> String {
        self.register(email, "secret1").await;
        let (status, body) = self
            .post("/login", None, json!({"email": email, "password": "secret1"}))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.upload_dir).ok();
    }
}
