use axum::extract::FromRequest;
use serde::Deserialize;

use crate::error::AppError;

/// `axum::Json` whose rejections go through [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// A JSON scalar that clients send either as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrText {
    pub fn is_blank(&self) -> bool {
        matches!(self, NumberOrText::Text(s) if s.trim().is_empty())
    }

    /// The value as a strictly positive `i32`, if it is one.
    pub fn positive_i32(&self) -> Option<i32> {
        let value = match self {
            NumberOrText::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            NumberOrText::Text(s) => s.trim().parse::<i64>().ok(),
        }?;
        i32::try_from(value).ok().filter(|v| *v > 0)
    }
}

/// A trimmed, non-empty string field, or `None`.
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A numeric field that was actually supplied.
pub fn present_number(value: Option<NumberOrText>) -> Option<NumberOrText> {
    value.filter(|v| !v.is_blank())
}
