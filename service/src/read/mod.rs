//! Read entities definitions.

pub mod alert;
pub mod borrowing;
pub mod game;
pub mod user;
