use crate::AppState;
use crate::api::error::AppError;
use crate::models::{
    ApiResponse, DeletedFileData, DownloadUrlData, FileListData, FileMetadataData, UploadUrlData,
};
use crate::services::keys::{
    Partition, PartitionStrategy, Region, build_file_id, display_name, sanitize_file_name,
};
use crate::utils::auth::Identity;
use crate::utils::validation::{
    parse_region, parse_region_filter, resolve_content_type, validate_allowed_type,
    validate_file_id, validate_file_size,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<u64>,
    /// Required under region partitioning: `UK` or `IRE`
    pub region: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegionQuery {
    /// `UK` or `IRE` (region partitioning only)
    pub region: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// `UK`, `IRE` or `all` (default)
    pub region: Option<String>,
}

/// Partition for a single-object request.
fn resolve_partition(
    state: &AppState,
    identity: &Identity,
    region: Option<&str>,
) -> Result<Partition, AppError> {
    match state.config.partition_strategy {
        PartitionStrategy::Region => Ok(Partition::Region(parse_region(region)?)),
        PartitionStrategy::User => Ok(Partition::User(identity.id.clone())),
    }
}

/// Validates the path id and the partition, then builds the key.
fn object_key(
    state: &AppState,
    identity: &Identity,
    file_id: &str,
    region: Option<&str>,
) -> Result<String, AppError> {
    validate_file_id(file_id)?;
    let partition = resolve_partition(state, identity, region)?;
    Ok(partition.key_for(file_id))
}

#[utoipa::path(
    post,
    path = "/api/files/upload-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload URL generated", body = UploadUrlData),
        (status = 400, description = "Invalid file name, content type, size or region"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn get_upload_url(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UploadUrlData>>, AppError> {
    let Json(req) = payload?;

    let file_name = req
        .file_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("fileName is required".to_string()))?;

    let sanitized = sanitize_file_name(file_name);
    let content_type = resolve_content_type(&sanitized, req.content_type.as_deref())?;
    validate_allowed_type(&content_type, &state.config.allowed_file_types)?;
    if let Some(size) = req.file_size {
        validate_file_size(size, state.config.max_file_size)?;
    }

    let partition = resolve_partition(&state, &identity, req.region.as_deref())?;
    let region = match &partition {
        Partition::Region(r) => Some(r.to_string()),
        Partition::User(_) => None,
    };

    let file_id = build_file_id(Utc::now().timestamp_millis(), &sanitized);
    let key = partition.key_for(&file_id);
    let expires_in = state.config.upload_url_ttl_secs;

    let upload_url = state
        .file_service
        .issue_upload_url(&key, &content_type, expires_in)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Upload URL generated successfully",
        UploadUrlData {
            upload_url,
            file_id,
            key,
            region,
            content_type,
            expires_in,
        },
    )))
}

#[utoipa::path(
    get,
    path = "/api/files/{file_id}/download-url",
    params(
        ("file_id" = String, Path, description = "Timestamped file id"),
        RegionQuery
    ),
    responses(
        (status = 200, description = "Download URL generated", body = DownloadUrlData),
        (status = 400, description = "Invalid file id or region"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn get_download_url(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    file_id: Result<Path<String>, PathRejection>,
    query: Result<Query<RegionQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<DownloadUrlData>>, AppError> {
    let Path(file_id) = file_id?;
    let Query(query) = query?;
    let key = object_key(&state, &identity, &file_id, query.region.as_deref())?;
    let expires_in = state.config.download_url_ttl_secs;

    let download_url = state.file_service.download_url(&key, expires_in).await?;

    Ok(Json(ApiResponse::ok(
        "Download URL generated successfully",
        DownloadUrlData {
            download_url,
            file_id,
            expires_in,
        },
    )))
}

#[utoipa::path(
    get,
    path = "/api/files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Files retrieved", body = FileListData),
        (status = 400, description = "Invalid region"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<ListFilesQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<FileListData>>, AppError> {
    let Query(query) = query?;
    let prefixes: Vec<String> = match state.config.partition_strategy {
        PartitionStrategy::Region => parse_region_filter(query.region.as_deref())?
            .into_iter()
            .map(|r: Region| Partition::Region(r).prefix())
            .collect(),
        PartitionStrategy::User => vec![Partition::User(identity.id.clone()).prefix()],
    };

    let files = state.file_service.list_under(&prefixes).await?;
    let count = files.len();

    Ok(Json(ApiResponse::ok(
        "Files retrieved successfully",
        FileListData { files, count },
    )))
}

#[utoipa::path(
    delete,
    path = "/api/files/{file_id}",
    params(
        ("file_id" = String, Path, description = "Timestamped file id"),
        RegionQuery
    ),
    responses(
        (status = 200, description = "File deleted", body = DeletedFileData),
        (status = 400, description = "Invalid file id or region"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    file_id: Result<Path<String>, PathRejection>,
    query: Result<Query<RegionQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<DeletedFileData>>, AppError> {
    let Path(file_id) = file_id?;
    let Query(query) = query?;
    let key = object_key(&state, &identity, &file_id, query.region.as_deref())?;

    state.file_service.delete(&key).await?;

    Ok(Json(ApiResponse::ok(
        "File deleted successfully",
        DeletedFileData { file_id },
    )))
}

#[utoipa::path(
    get,
    path = "/api/files/{file_id}/metadata",
    params(
        ("file_id" = String, Path, description = "Timestamped file id"),
        RegionQuery
    ),
    responses(
        (status = 200, description = "File metadata", body = FileMetadataData),
        (status = 400, description = "Invalid file id or region"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn get_file_metadata(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    file_id: Result<Path<String>, PathRejection>,
    query: Result<Query<RegionQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<FileMetadataData>>, AppError> {
    let Path(file_id) = file_id?;
    let Query(query) = query?;
    let key = object_key(&state, &identity, &file_id, query.region.as_deref())?;

    let metadata = state.file_service.metadata(&key).await?;

    Ok(Json(ApiResponse::ok(
        "File metadata retrieved successfully",
        FileMetadataData {
            name: display_name(&file_id).to_string(),
            file_id,
            content_type: metadata.content_type,
            size: metadata.content_length,
            last_modified: metadata.last_modified,
            etag: metadata.etag,
        },
    )))
}
