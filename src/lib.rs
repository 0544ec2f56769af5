pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;
