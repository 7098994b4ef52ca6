use crate::Infringements;
use crate::model::{
    AppendItemsRequest, CreateInfringementRequest, InfringementCommand, InfringementView,
    UpdateInfringementRequest,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rego_derive::api_handler;
use rego_domain::constants::INFRINGEMENT_TAG;
use rego_domain::status::InfringementStatus;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_infringements, create_infringement))
        .routes(routes!(get_infringement, update_infringement))
        .routes(routes!(transition_infringement))
        .routes(routes!(append_items))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListQuery {
    /// Only records in this status.
    status: Option<InfringementStatus>,
}

#[api_handler(
    get,
    path = "/api/infringements",
    params(ListQuery),
    responses((status = OK, body = Vec<InfringementView>)),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn list_infringements(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<InfringementView>>> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok(Json(slice.service.list(&ctx, query.status).await?))
}

#[api_handler(
    post,
    path = "/api/infringements",
    request_body = CreateInfringementRequest,
    responses(
        (status = CREATED, body = InfringementView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn create_infringement(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Json(request): Json<CreateInfringementRequest>,
) -> ApiResult<(StatusCode, Json<InfringementView>)> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok((StatusCode::CREATED, Json(slice.service.create(&ctx, request).await?)))
}

#[api_handler(
    get,
    path = "/api/infringements/{id}",
    params(("id" = String, Path)),
    responses((status = OK, body = InfringementView), (status = NOT_FOUND, body = ErrorBody)),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn get_infringement(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<InfringementView>> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok(Json(slice.service.get(&ctx, &id).await?))
}

#[api_handler(
    patch,
    path = "/api/infringements/{id}",
    params(("id" = String, Path)),
    request_body = UpdateInfringementRequest,
    responses(
        (status = OK, body = InfringementView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn update_infringement(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateInfringementRequest>,
) -> ApiResult<Json<InfringementView>> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok(Json(slice.service.update(&ctx, &id, request).await?))
}

#[api_handler(
    post,
    path = "/api/infringements/{id}/transitions",
    params(("id" = String, Path)),
    request_body = InfringementCommand,
    responses(
        (status = OK, body = InfringementView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = CONFLICT, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn transition_infringement(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(command): Json<InfringementCommand>,
) -> ApiResult<Json<InfringementView>> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok(Json(slice.service.transition(&ctx, &id, command).await?))
}

#[api_handler(
    post,
    path = "/api/infringements/{id}/items",
    params(("id" = String, Path)),
    request_body = AppendItemsRequest,
    responses(
        (status = OK, body = InfringementView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INFRINGEMENT_TAG,
)]
async fn append_items(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<AppendItemsRequest>,
) -> ApiResult<Json<InfringementView>> {
    let slice = state.try_get_slice::<Infringements>()?;
    Ok(Json(slice.service.append_items(&ctx, &id, request).await?))
}
