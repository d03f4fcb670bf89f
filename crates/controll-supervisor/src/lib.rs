// controll-supervisor: HTTP management surface of the Controll add-on.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
