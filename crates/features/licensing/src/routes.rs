use crate::Licensing;
use crate::model::{CreateLicenseRequest, LicenseCommand, LicenseView, UpdateLicenseRequest};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rego_derive::api_handler;
use rego_domain::constants::LICENSING_TAG;
use rego_domain::status::LicenseStatus;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_licenses, create_license))
        .routes(routes!(get_license, update_license))
        .routes(routes!(transition_license))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListQuery {
    /// Only records in this status.
    status: Option<LicenseStatus>,
}

#[api_handler(
    get,
    path = "/api/operator-licenses",
    params(ListQuery),
    responses((status = OK, body = Vec<LicenseView>)),
    security(("bearer" = [])),
    tag = LICENSING_TAG,
)]
async fn list_licenses(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<LicenseView>>> {
    let slice = state.try_get_slice::<Licensing>()?;
    Ok(Json(slice.service.list(&ctx, query.status).await?))
}

#[api_handler(
    post,
    path = "/api/operator-licenses",
    request_body = CreateLicenseRequest,
    responses(
        (status = CREATED, body = LicenseView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = LICENSING_TAG,
)]
async fn create_license(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Json(request): Json<CreateLicenseRequest>,
) -> ApiResult<(StatusCode, Json<LicenseView>)> {
    let slice = state.try_get_slice::<Licensing>()?;
    Ok((StatusCode::CREATED, Json(slice.service.create(&ctx, request).await?)))
}

#[api_handler(
    get,
    path = "/api/operator-licenses/{id}",
    params(("id" = String, Path)),
    responses((status = OK, body = LicenseView), (status = NOT_FOUND, body = ErrorBody)),
    security(("bearer" = [])),
    tag = LICENSING_TAG,
)]
async fn get_license(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<LicenseView>> {
    let slice = state.try_get_slice::<Licensing>()?;
    Ok(Json(slice.service.get(&ctx, &id).await?))
}

#[api_handler(
    patch,
    path = "/api/operator-licenses/{id}",
    params(("id" = String, Path)),
    request_body = UpdateLicenseRequest,
    responses(
        (status = OK, body = LicenseView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = LICENSING_TAG,
)]
async fn update_license(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateLicenseRequest>,
) -> ApiResult<Json<LicenseView>> {
    let slice = state.try_get_slice::<Licensing>()?;
    Ok(Json(slice.service.update(&ctx, &id, request).await?))
}

#[api_handler(
    post,
    path = "/api/operator-licenses/{id}/transitions",
    params(("id" = String, Path)),
    request_body = LicenseCommand,
    responses(
        (status = OK, body = LicenseView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = CONFLICT, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = LICENSING_TAG,
)]
async fn transition_license(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(command): Json<LicenseCommand>,
) -> ApiResult<Json<LicenseView>> {
    let slice = state.try_get_slice::<Licensing>()?;
    Ok(Json(slice.service.transition(&ctx, &id, command).await?))
}
