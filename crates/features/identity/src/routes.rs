use crate::Identity;
use crate::users::{ChangeRoleRequest, UpsertUserRequest, UserView};
use axum::Json;
use axum::extract::{Path, State};
use rego_derive::api_handler;
use rego_domain::constants::IDENTITY_TAG;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_users))
        .routes(routes!(current_user))
        .routes(routes!(upsert_user))
        .routes(routes!(change_role))
}

#[api_handler(
    get,
    path = "/api/users",
    responses(
        (status = OK, body = Vec<UserView>),
        (status = FORBIDDEN, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = IDENTITY_TAG,
)]
async fn list_users(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<UserView>>> {
    let slice = state.try_get_slice::<Identity>()?;
    Ok(Json(slice.users.list(&ctx).await?))
}

#[api_handler(
    get,
    path = "/api/users/me",
    responses(
        (status = OK, body = UserView),
        (status = UNAUTHORIZED, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = IDENTITY_TAG,
)]
async fn current_user(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> ApiResult<Json<UserView>> {
    let slice = state.try_get_slice::<Identity>()?;
    Ok(Json(slice.users.me(&ctx).await?))
}

#[api_handler(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "Identity provider subject")),
    request_body = UpsertUserRequest,
    responses(
        (status = OK, body = UserView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = IDENTITY_TAG,
)]
async fn upsert_user(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<UpsertUserRequest>,
) -> ApiResult<Json<UserView>> {
    let slice = state.try_get_slice::<Identity>()?;
    Ok(Json(slice.users.upsert(&ctx, &id, request).await?))
}

#[api_handler(
    put,
    path = "/api/users/{id}/role",
    params(("id" = String, Path, description = "Identity provider subject")),
    request_body = ChangeRoleRequest,
    responses(
        (status = OK, body = UserView),
        (status = FORBIDDEN, body = ErrorBody),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = IDENTITY_TAG,
)]
async fn change_role(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(request): Json<ChangeRoleRequest>,
) -> ApiResult<Json<UserView>> {
    let slice = state.try_get_slice::<Identity>()?;
    Ok(Json(slice.users.change_role(&ctx, &id, request.role).await?))
}
