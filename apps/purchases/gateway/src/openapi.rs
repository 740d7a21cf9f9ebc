use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Purchases Gateway",
        version = "0.1.0",
        description = "Accepts purchases onto the broker and proxies the stored listing"
    ),
    servers(
        (url = "/api", description = "API base path")
    )
)]
struct BaseDoc;

pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        BaseDoc::openapi().merge_from(domain_purchases::GatewayApiDoc::openapi())
    }
}
