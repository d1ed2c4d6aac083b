pub mod config;
pub mod enums;
pub mod error;
pub mod models;
pub mod db;
pub mod rpc;
pub mod metadata;
pub mod feeds;
pub mod services;
pub mod scheduler;
pub mod api;

#[cfg(test)]
pub mod testing;

pub use config::Config;
pub use enums::{ RpcProtocol, TokenKind };
pub use error::{ AppError, Result };
