pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod shopping;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pantry Recipe API",
        version = "1.0.0",
        description = "API for the Pantry recipe sharing service"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::set_password,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::subscribe,
        handlers::user::unsubscribe,
        handlers::user::list_subscriptions,
        handlers::tag::list_tags,
        handlers::tag::get_tag,
        handlers::ingredient::list_ingredients,
        handlers::ingredient::get_ingredient,
        handlers::recipe::list_recipes,
        handlers::recipe::create_recipe,
        handlers::recipe::get_recipe,
        handlers::recipe::update_recipe,
        handlers::recipe::delete_recipe,
        handlers::recipe::add_favorite,
        handlers::recipe::remove_favorite,
        handlers::recipe::add_to_cart,
        handlers::recipe::remove_from_cart,
        handlers::shopping::download_shopping_cart,
        handlers::media::get_media,
    ),
    tags(
        (name = "Auth", description = "Registration, login, and account management"),
        (name = "Users", description = "User profiles and author subscriptions"),
        (name = "Tags", description = "Recipe tag catalogue"),
        (name = "Ingredients", description = "Ingredient catalogue search"),
        (name = "Recipes", description = "Recipe CRUD, favorites, and cart membership"),
        (name = "Shopping Cart", description = "Shopping list PDF export"),
        (name = "Media", description = "Content-addressed image serving"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
