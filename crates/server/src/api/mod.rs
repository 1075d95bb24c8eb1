pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod status;
pub mod tasks;

pub use routes::create_router;
