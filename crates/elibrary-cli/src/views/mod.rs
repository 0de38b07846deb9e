//! Screens of the client. Each function renders one route.

pub mod books;
pub mod manage;
pub mod profile;
pub mod signin;
pub mod validation;
