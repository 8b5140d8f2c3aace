use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

// `Json` and `Path` with their rejections reported as `AppError::InvalidInput`.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
