//! HTTP surface of the media sharing backend

pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod state;

pub use routes::create_router;
pub use settings::Settings;
pub use state::AppState;
