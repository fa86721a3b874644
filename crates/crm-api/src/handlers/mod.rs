//! HTTP handlers

pub mod central;
pub mod health;
pub mod tenant;

use crate::error::ApiError;
use crate::response::ApiResponse;

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
