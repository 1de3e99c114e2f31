//! Success envelope: `{"status":"success","message"?,"data"?}`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct Success<T: Serialize> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Success<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message),
            data: Some(data),
        }
    }

    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }
}

impl Success<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            status: "success",
            message: Some(message),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
