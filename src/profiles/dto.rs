use serde::{Deserialize, Serialize};

use super::repo_types::{Profile, ProfileFields};
use crate::{
    error::{AppError, AppResult},
    extract::{present, present_number, NumberOrText},
};

#[derive(Debug, Default, Deserialize)]
pub struct CreateProfileRequest {
    pub name: Option<String>,
    pub age: Option<NumberOrText>,
    pub gender: Option<String>,
    pub citizen: Option<String>,
}

/// Partial update; absent or blank fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub age: Option<NumberOrText>,
    pub gender: Option<String>,
    pub citizen: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileEnvelope {
    pub message: String,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureResponse {
    pub message: String,
    pub profile_pict_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_age(value: &NumberOrText) -> AppResult<i32> {
    value
        .positive_i32()
        .ok_or_else(|| AppError::BadRequest("Age must be a positive integer".into()))
}

impl CreateProfileRequest {
    pub fn validate(self) -> AppResult<ProfileFields> {
        let (Some(name), Some(age), Some(gender), Some(citizen)) = (
            present(self.name),
            present_number(self.age),
            present(self.gender),
            present(self.citizen),
        ) else {
            return Err(AppError::BadRequest(
                "All fields (name, age, gender, citizen) are required".into(),
            ));
        };
        Ok(ProfileFields {
            name,
            age: parse_age(&age)?,
            gender,
            citizen,
        })
    }
}

impl UpdateProfileRequest {
    pub fn apply(self, current: &Profile) -> AppResult<ProfileFields> {
        let mut fields = ProfileFields::from(current);
        if let Some(name) = present(self.name) {
            fields.name = name;
        }
        if let Some(age) = present_number(self.age) {
            fields.age = parse_age(&age)?;
        }
        if let Some(gender) = present(self.gender) {
            fields.gender = gender;
        }
        if let Some(citizen) = present(self.citizen) {
            fields.citizen = citizen;
        }
        Ok(fields)
    }
}
