pub mod cors;
pub mod feedback;
pub mod journal;
pub mod responses;
pub mod router;
pub mod state;

pub use state::AppState;
