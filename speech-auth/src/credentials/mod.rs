//! Client credentials resolved from options and the process environment.

mod store;

pub use store::{Credentials, CLIENT_ID_ENV, CLIENT_SECRET_ENV};
