pub mod adaptive;
pub mod gk15;

pub use adaptive::{integrate, integrate_semi_infinite, IntegrationOutcome};
