pub mod admin;
pub mod completion;
pub mod engine;
mod handlers;
pub mod notices;
pub mod notify;
pub mod seed;
pub mod session;
pub mod store;

use crate::admin::AdminService;
use crate::completion::CompletionProvider;
use crate::engine::ConversationEngine;
use crate::handlers::*;
use crate::notify::Notifier;
use crate::session::SessionManager;
use crate::store::{Slots, Store};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use handlers::ApiError;

pub const DEFAULT_CONTACT_URL: &str = "https://t.me/companion_support";

#[derive(Clone, Debug)]
pub struct AppOptions {
    pub admin_passphrase: String,
    pub contact_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub slots: Arc<Slots>,
    pub session: Arc<SessionManager>,
    pub engine: Arc<ConversationEngine>,
    pub admin: Arc<AdminService>,
    pub contact_url: Arc<str>,
}

impl AppState {
    /// Loads every slot from the store and wires the services together.
    pub async fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CompletionProvider>,
        notifier: Arc<dyn Notifier>,
        options: AppOptions,
    ) -> Self {
        let slots = Arc::new(Slots::load(store).await);
        slots.watch();

        let session = Arc::new(SessionManager::new(slots.clone(), options.admin_passphrase));
        let engine = Arc::new(ConversationEngine::new(
            slots.clone(),
            session.clone(),
            provider,
            notifier,
        ));
        let admin = Arc::new(AdminService::new(slots.clone(), session.clone(), engine.clone()));

        Self {
            slots,
            session,
            engine,
            admin,
            contact_url: options.contact_url.into(),
        }
    }
}

pub fn init(router: Router<AppState>, state: AppState) -> Router<()> {
    router
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/admin", post(elevate_admin))
        .route("/api/characters", get(list_characters))
        .route("/api/characters/{character_id}", get(get_character))
        .route("/api/tags", get(list_tags))
        .route(
            "/api/conversations",
            get(list_conversations).post(open_conversation),
        )
        .route("/api/conversations/unread", get(unread_total))
        .route(
            "/api/conversations/{conversation_id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route(
            "/api/conversations/{conversation_id}/messages",
            post(send_message),
        )
        .route(
            "/api/conversations/{conversation_id}/settings",
            put(update_settings),
        )
        .route(
            "/api/conversations/{conversation_id}/sync-prompt",
            post(sync_prompt),
        )
        .route(
            "/api/preferences",
            get(get_preferences).put(update_preferences),
        )
        .route("/api/preferences/theme/toggle", post(toggle_theme))
        .route("/api/plans", get(list_plans))
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/{user_id}/balance",
            post(adjust_user_balance),
        )
        .route("/api/admin/characters", post(create_character))
        .route(
            "/api/admin/characters/{character_id}",
            put(update_character).delete(delete_character),
        )
        .route("/api/admin/conversations", get(all_conversations))
        .route(
            "/api/admin/conversations/{conversation_id}",
            delete(remove_conversation),
        )
        .route("/api/admin/export", get(export_conversations))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
