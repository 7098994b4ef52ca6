use crate::Registrations;
use crate::model::{
    CreateRegistrationRequest, RegistrationCommand, RegistrationView, UpdateRegistrationRequest,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rego_derive::api_handler;
use rego_domain::constants::REGISTRATION_TAG;
use rego_domain::status::RegistrationStatus;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_registrations, create_registration))
        .routes(routes!(get_registration, update_registration))
        .routes(routes!(transition_registration))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListQuery {
    /// Only records in this status.
    status: Option<RegistrationStatus>,
}

#[api_handler(
    get,
    path = "/api/registrations",
    params(ListQuery),
    responses((status = OK, body = Vec<RegistrationView>)),
    security(("bearer" = [])),
    tag = REGISTRATION_TAG,
)]
async fn list_registrations(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<RegistrationView>>> {
    let slice = state.try_get_slice::<Registrations>()?;
    Ok(Json(slice.service.list(&ctx, query.status).await?))
}

#[api_handler(
    post,
    path = "/api/registrations",
    request_body = CreateRegistrationRequest,
    responses(
        (status = CREATED, body = RegistrationView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = REGISTRATION_TAG,
)]
async fn create_registration(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Json(request): Json<CreateRegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationView>)> {
    let slice = state.try_get_slice::<Registrations>()?;
    Ok((StatusCode::CREATED, Json(slice.service.create(&ctx, request).await?)))
}

#[api_handler(
    get,
    path = "/api/registrations/{id}",
    params(("id" = String, Path)),
    responses((status = OK, body = RegistrationView), (status = NOT_FOUND, body = ErrorBody)),
    security(("bearer" = [])),
    tag = REGISTRATION_TAG,
)]
async fn get_registration(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<RegistrationView>> {
    let slice = state.try_get_slice::<Registrations>()?;
    Ok(Json(slice.service.get(&ctx, &id).await?))
}

#[api_handler(
    patch,
    path = "/api/registrations/{id}",
    params(("id" = String, Path)),
    request_body = UpdateRegistrationRequest,
    responses(
        (status = OK, body = RegistrationView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = REGISTRATION_TAG,
)]
async fn update_registration(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateRegistrationRequest>,
) -> ApiResult<Json<RegistrationView>> {
    let slice = state.try_get_slice::<Registrations>()?;
    Ok(Json(slice.service.update(&ctx, &id, request).await?))
}

#[api_handler(
    post,
    path = "/api/registrations/{id}/transitions",
    params(("id" = String, Path)),
    request_body = RegistrationCommand,
    responses(
        (status = OK, body = RegistrationView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = CONFLICT, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = REGISTRATION_TAG,
)]
async fn transition_registration(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(command): Json<RegistrationCommand>,
) -> ApiResult<Json<RegistrationView>> {
    let slice = state.try_get_slice::<Registrations>()?;
    Ok(Json(slice.service.transition(&ctx, &id, command).await?))
}
