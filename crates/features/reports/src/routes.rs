use crate::report::Report;
use crate::service::{EmptyReport, ReportOutput};
use crate::Reports;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use rego_derive::api_handler;
use rego_domain::constants::REPORT_TAG;
use rego_kernel::ServiceError;
use rego_kernel::context::RequestContext;
use rego_kernel::server::{ApiResult, ApiState, ErrorBody};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(export_report))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ExportQuery {
    /// Comma-separated column names, in output order. Defaults to every column.
    columns: Option<String>,
}

#[api_handler(
    get,
    path = "/api/reports/{report}",
    params(
        ("report" = Report, Path, description = "Report name"),
        ExportQuery,
    ),
    responses(
        (
            status = OK,
            description = "RFC 4180 CSV attachment",
            content_type = "text/csv",
            body = String
        ),
        (status = OK, description = "Nothing matched", body = EmptyReport),
        (status = NOT_FOUND, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = REPORT_TAG,
)]
async fn export_report(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(report): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let slice = state.try_get_slice::<Reports>()?;
    let report = Report::from_str(&report).map_err(|_| ServiceError::not_found("reports", report))?;

    Ok(match slice.service.export(&ctx, report, query.columns.as_deref()).await? {
        ReportOutput::Csv { filename, body, .. } => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
            ],
            body,
        )
            .into_response(),
        ReportOutput::Empty(notice) => Json::<EmptyReport>(notice).into_response(),
    })
}
