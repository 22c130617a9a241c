pub mod error_page;
pub mod role_guard;
pub mod user_context;
