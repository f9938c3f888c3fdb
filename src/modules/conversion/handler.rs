use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::{receive_file, UploadError};
use crate::modules::conversion::dto::*;
use crate::modules::conversion::service::ConversionService;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

/// Multipart field carrying the clip.
pub const VIDEO_FIELD: &str = "video";

/// Submit a clip for conversion
/// The upload is stored, a job is registered and conversion starts in the background.
#[utoipa::path(
    post,
    path = "/api/convert",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Conversion started", body = ApiResponse<SubmitResponse>),
        (status = 400, description = "No video supplied"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Conversion"
)]
pub async fn submit_conversion(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => {
            warn!("Rejected submission: {}", e);
            return ApiError::from(UploadError::MissingFile).into_response();
        }
    };

    let upload = match receive_file(&mut multipart, VIDEO_FIELD, &state.config.upload_dir).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Rejected submission: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    match ConversionService::submit(&state, upload).await {
        Ok(job_id) => {
            let res = SubmitResponse {
                status_url: format!("/api/convert/{}", job_id),
                status: JobStatusKind::Pending,
                job_id,
            };
            ApiSuccess(ApiResponse::success(res, "Conversion started"), StatusCode::ACCEPTED).into_response()
        }
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}

/// Poll a conversion job
/// A completed job is reported once; later polls answer 404.
#[utoipa::path(
    get,
    path = "/api/convert/{job_id}",
    params(
        ("job_id" = String, Path, description = "Job ID returned on submission")
    ),
    responses(
        (status = 200, description = "Job status", body = ApiResponse<JobStatusResponse>),
        (status = 404, description = "Unknown job")
    ),
    tag = "Conversion"
)]
pub async fn get_conversion_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let status = ConversionService::status(&state, &job_id).await;

    match JobStatusResponse::from_status(job_id, status) {
        Some(res) => {
            if let Some(url) = &res.url {
                info!("Delivered {} for job {}", url, res.job_id);
            }
            ApiSuccess(ApiResponse::success(res, "Job status retrieved"), StatusCode::OK).into_response()
        }
        None => ApiError::not_found("Unknown job").into_response(),
    }
}
