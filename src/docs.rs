use utoipa::OpenApi;
use crate::modules::conversion::dto::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::conversion::handler::submit_conversion,
        crate::modules::conversion::handler::get_conversion_status,
    ),
    components(
        schemas(SubmitResponse, JobStatusResponse, JobStatusKind)
    ),
    tags(
        (name = "Conversion", description = "Upload clips and poll their conversion")
    )
)]
pub struct ApiDoc;
