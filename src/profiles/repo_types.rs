use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Profile row; at most one per user.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub citizen: String,
    pub profile_pict: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub citizen: String,
}

impl From<&Profile> for ProfileFields {
    fn from(p: &Profile) -> Self {
        Self {
            name: p.name.clone(),
            age: p.age,
            gender: p.gender.clone(),
            citizen: p.citizen.clone(),
        }
    }
}
