//! Domain definitions.

pub mod alert;
pub mod borrowing;
pub mod game;
pub mod user;

pub use self::{
    alert::Alert, borrowing::Borrowing, game::Game, user::User,
};
