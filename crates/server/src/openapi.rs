use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub username: String, pub email: String, pub password: String, pub confirm_password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub username: String, pub password: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::google,
        crate::routes::events::list,
        crate::routes::events::detail,
        crate::routes::events::search,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            crate::routes::auth::TokenOutput,
            crate::routes::auth::GoogleInput,
            crate::routes::auth::GoogleOutput,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "events")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_public_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/api/register", "/api/login", "/api/auth/google", "/events", "/events/{id}", "/events/search"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
