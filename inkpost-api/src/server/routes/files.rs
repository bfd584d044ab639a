use crate::server::{Result, ServerError, ServerRouter, auth::Viewer, body::Json};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use axum_extra::routing::{RouterExt, TypedPath};
use inkpost_common::{
    config::SiteConfig,
    model::{
        file::{FileId, StoredFile},
        role::Permission,
    },
};
use inkpost_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const UPLOAD_FIELD: &str = "file";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(upload_file)
        .typed_get(get_file)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct UploadResponse {
    id: FileId,
    filename: String,
    link: String,
}

impl From<StoredFile> for UploadResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            link: format!("/files/{}", file.id),
            id: file.id,
            filename: file.filename,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/files/upload", rejection(ServerError))]
struct UploadPath();

async fn upload_file(
    UploadPath(): UploadPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let uploader = viewer.require_user(Permission::CanUploadFiles)?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_owned();
        let contents = field.bytes().await?;
        let file = store.store_file(&filename, &contents, &config).await?;
        info!(
            file_id = %file.id,
            filename = %file.filename,
            uploader = %uploader.username,
            "File uploaded"
        );

        return Ok(Json(file.into()));
    }

    Err(ServerError::MissingUpload)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/files/{id}", rejection(ServerError))]
struct FilePath {
    id: FileId,
}

async fn get_file(
    FilePath { id }: FilePath,
    State(store): State<Arc<Store>>,
) -> Result<impl IntoResponse> {
    if !id.is_well_formed() {
        return Err(ServerError::FileByIdNotFound(id));
    }
    let Some(file) = store.db().fetch_file(&id).await? else {
        return Err(ServerError::FileByIdNotFound(id));
    };
    let contents = store.read_file(&file).await?;

    Ok(([(CONTENT_TYPE, file.content_type())], contents))
}
