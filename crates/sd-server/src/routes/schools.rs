//! School CRUD route handlers.
//!
//! Mounted both under `/api/schools` and `/schools`. The record id travels in
//! the `id` query parameter and write requests are `multipart/form-data`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use sd_core::{Error, SchoolId};
use sd_db::models::School;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::{AppError, ErrorResponse};
use crate::form::SchoolForm;

/// Query parameters accepted by the school endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolQuery {
    /// School id.
    pub id: Option<String>,
    /// Image path the client believes the school has. Accepted for older
    /// clients; cleanup always uses the stored image key.
    #[serde(rename = "imagePath")]
    pub image_path: Option<String>,
}

impl SchoolQuery {
    fn school_id(&self) -> Result<Option<SchoolId>, Error> {
        match self.id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Error::Validation(format!("Invalid school id: {raw:?}"))),
        }
    }

    fn require_id(&self) -> Result<SchoolId, Error> {
        self.school_id()?
            .ok_or_else(|| Error::Validation("School id is required".into()))
    }
}

/// School as returned by the API.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SchoolResponse {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Always ten decimal digits, leading zeros kept.
    pub contact: String,
    pub email_id: String,
    /// Public URL or path of the image.
    pub image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SchoolResponse {
    fn from_model(school: &School) -> Self {
        Self {
            id: school.id.get(),
            name: school.name.clone(),
            address: school.address.clone(),
            city: school.city.clone(),
            state: school.state.clone(),
            contact: school.contact.to_string(),
            email_id: school.email_id.clone(),
            image: school.image.clone(),
            created_at: school.created_at.clone(),
            updated_at: school.updated_at.clone(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreatedResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UpdatedResponse {
    pub message: String,
    pub school: SchoolResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Multipart body for create and update, as shown in the API docs.
#[derive(Debug, utoipa::ToSchema)]
pub struct SchoolFormBody {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Exactly ten digits.
    pub contact: String,
    pub email_id: String,
    /// JPEG or PNG, required on create.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

fn parse_query(query: Result<Query<SchoolQuery>, QueryRejection>) -> Result<SchoolQuery, Error> {
    query
        .map(|Query(q)| q)
        .map_err(|e| Error::Validation(e.body_text()))
}

/// GET /api/schools
#[utoipa::path(
    get,
    path = "/api/schools",
    params(SchoolQuery),
    responses(
        (status = 200, description = "All schools, or a one-element list when `id` is given", body = Vec<SchoolResponse>),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    )
)]
pub async fn list_schools(
    State(ctx): State<AppContext>,
    query: Result<Query<SchoolQuery>, QueryRejection>,
) -> Result<Json<Vec<SchoolResponse>>, AppError> {
    let query = parse_query(query)?;

    let schools = match query.school_id()? {
        Some(id) => vec![ctx.workflow.get(id).await?],
        None => ctx.workflow.list().await?,
    };

    Ok(Json(schools.iter().map(SchoolResponse::from_model).collect()))
}

/// POST /api/schools
#[utoipa::path(
    post,
    path = "/api/schools",
    request_body(content = SchoolFormBody, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "School created", body = CreatedResponse),
        (status = 400, description = "Invalid fields or image", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
pub async fn create_school(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let form = SchoolForm::from_multipart(multipart).await?;
    let fields = form.fields.into_fields()?;

    let school = ctx.workflow.create(fields, form.image).await?;

    Ok(Json(CreatedResponse {
        message: "School added successfully".into(),
        id: school.id.get(),
    }))
}

/// PUT /api/schools?id=
#[utoipa::path(
    put,
    path = "/api/schools",
    params(SchoolQuery),
    request_body(content = SchoolFormBody, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "School updated", body = UpdatedResponse),
        (status = 400, description = "Missing id, invalid fields or image", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
pub async fn update_school(
    State(ctx): State<AppContext>,
    query: Result<Query<SchoolQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let id = parse_query(query)?.require_id()?;
    let form = SchoolForm::from_multipart(multipart).await?;
    let patch = form.fields.into_patch()?;

    let school = ctx.workflow.update(id, patch, form.image).await?;

    Ok(Json(UpdatedResponse {
        message: "School updated successfully".into(),
        school: SchoolResponse::from_model(&school),
    }))
}

/// DELETE /api/schools?id=
#[utoipa::path(
    delete,
    path = "/api/schools",
    params(SchoolQuery),
    responses(
        (status = 200, description = "School deleted", body = MessageResponse),
        (status = 400, description = "Missing or invalid id", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    )
)]
pub async fn delete_school(
    State(ctx): State<AppContext>,
    query: Result<Query<SchoolQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let query = parse_query(query)?;
    let id = query.require_id()?;

    let deleted = ctx.workflow.delete(id).await?;

    if let Some(claimed) = query.image_path.as_deref() {
        if claimed != deleted.image {
            tracing::debug!(
                %id,
                claimed,
                stored = %deleted.image,
                "imagePath does not match the stored image; used the stored key"
            );
        }
    }

    Ok(Json(MessageResponse {
        message: "School deleted successfully".into(),
    }))
}
