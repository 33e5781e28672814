pub mod categories;
pub mod posts;

use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/posts", post_routes())
        .nest("/api/categories", category_routes())
        .with_state(state)
}

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::get_posts).post(posts::create_post))
        .route("/search", get(posts::search_posts))
        .route(
            "/{identifier}",
            get(posts::get_one_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/{id}/publish", post(posts::toggle_publish))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::get_categories).post(categories::create_category),
        )
        .route(
            "/{identifier}",
            get(categories::get_one_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
}
