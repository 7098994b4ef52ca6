use crate::Inspections;
use crate::model::{
    AppendChecklistRequest, AssessItemRequest, CreateInspectionRequest, InspectionCommand,
    InspectionView, OverallResultRequest, UpdateScheduleRequest,
};
use crate::suggest::SuggestedItem;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rego_derive::api_handler;
use rego_domain::constants::INSPECTION_TAG;
use rego_domain::status::InspectionStatus;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_inspections, create_inspection))
        .routes(routes!(get_inspection, update_schedule))
        .routes(routes!(transition_inspection))
        .routes(routes!(append_checklist))
        .routes(routes!(assess_item))
        .routes(routes!(set_overall_result))
        .routes(routes!(suggest_checklist))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListQuery {
    /// Only records in this status.
    status: Option<InspectionStatus>,
}

#[api_handler(
    get,
    path = "/api/inspections",
    params(ListQuery),
    responses((status = OK, body = Vec<InspectionView>)),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn list_inspections(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<InspectionView>>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.list(&ctx, query.status).await?))
}

#[api_handler(
    post,
    path = "/api/inspections",
    request_body = CreateInspectionRequest,
    responses(
        (status = CREATED, body = InspectionView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn create_inspection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Json(request): Json<CreateInspectionRequest>,
) -> ApiResult<(StatusCode, Json<InspectionView>)> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok((StatusCode::CREATED, Json(slice.service.create(&ctx, request).await?)))
}

#[api_handler(
    get,
    path = "/api/inspections/{id}",
    params(("id" = String, Path)),
    responses((status = OK, body = InspectionView), (status = NOT_FOUND, body = ErrorBody)),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn get_inspection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.get(&ctx, &id).await?))
}

#[api_handler(
    patch,
    path = "/api/inspections/{id}",
    params(("id" = String, Path)),
    request_body = UpdateScheduleRequest,
    responses(
        (status = OK, body = InspectionView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn update_schedule(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateScheduleRequest>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.update_schedule(&ctx, &id, request).await?))
}

#[api_handler(
    post,
    path = "/api/inspections/{id}/transitions",
    params(("id" = String, Path)),
    request_body = InspectionCommand,
    responses(
        (status = OK, body = InspectionView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = CONFLICT, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn transition_inspection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(command): Json<InspectionCommand>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.transition(&ctx, &id, command).await?))
}

#[api_handler(
    post,
    path = "/api/inspections/{id}/checklist",
    params(("id" = String, Path)),
    request_body = AppendChecklistRequest,
    responses(
        (status = OK, body = InspectionView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn append_checklist(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<AppendChecklistRequest>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.append_checklist(&ctx, &id, request).await?))
}

#[api_handler(
    put,
    path = "/api/inspections/{id}/checklist/{item_id}",
    params(("id" = String, Path), ("item_id" = String, Path)),
    request_body = AssessItemRequest,
    responses(
        (status = OK, body = InspectionView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn assess_item(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<AssessItemRequest>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.assess_item(&ctx, &id, &item_id, request).await?))
}

#[api_handler(
    put,
    path = "/api/inspections/{id}/overall-result",
    params(("id" = String, Path)),
    request_body = OverallResultRequest,
    responses((status = OK, body = InspectionView), (status = FORBIDDEN, body = ErrorBody)),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn set_overall_result(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<OverallResultRequest>,
) -> ApiResult<Json<InspectionView>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.set_overall_result(&ctx, &id, request).await?))
}

/// Proposes checklist items without saving them.
#[api_handler(
    post,
    path = "/api/inspections/{id}/checklist/suggestions",
    params(("id" = String, Path)),
    responses(
        (status = OK, body = Vec<SuggestedItem>),
        (status = FORBIDDEN, body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = INSPECTION_TAG,
)]
async fn suggest_checklist(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SuggestedItem>>> {
    let slice = state.try_get_slice::<Inspections>()?;
    Ok(Json(slice.service.suggest(&ctx, &id).await?))
}
