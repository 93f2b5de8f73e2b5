//! `OpenAPI` specification generation for `vigil-api`.
//!
//! The generated document is served at `/openapi.json` and used to keep
//! check-in frontends in sync with the API surface.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the Vigil duty API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vigil API",
        description = "Exam-duty check-in and paper-submission tracking"
    ),
    paths(
        crate::routes::duty::check_mobile,
        crate::routes::duty::today_roster,
        crate::routes::duty::full_roster,
        crate::routes::duty::query_duties,
        crate::routes::duty::report,
        crate::routes::duty::proxy_report,
        crate::routes::duty::submit,
        crate::routes::staff::staff_by_mobile,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::duty::ReportRequest,
            crate::routes::duty::ProxyRequest,
            crate::routes::duty::SubmitRequest,
            crate::routes::duty::DutyActionReply,
            crate::routes::duty::CheckMobileResponse,
            crate::routes::duty::DutyView,
            crate::routes::staff::StaffResponse,
        )
    ),
    tags(
        (name = "duty", description = "Duty check-in, proxy, and submission operations"),
        (name = "staff", description = "Staff verification lookups"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_duty_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/duty/check-mobile/{mobile}",
            "/duty/today",
            "/duty/all",
            "/duty/query",
            "/duty/report",
            "/duty/proxy",
            "/duty/submit",
            "/staff/by-mobile/{mobile}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}, have {paths:?}"
            );
        }
    }
}
