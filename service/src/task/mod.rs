//! Background [`Task`]s definitions.

mod background;
pub mod generate_alerts;

pub use common::Handler as Task;

pub use self::{background::Background, generate_alerts::GenerateAlerts};
