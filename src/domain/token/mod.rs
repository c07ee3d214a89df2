//! Token domain: refresh token records and the ledger they live in

mod entity;
mod repository;

pub use entity::{DeviceContext, RefreshTokenRecord};
pub use repository::TokenLedger;
