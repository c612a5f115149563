//! Database layer for Stockpile

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{
    ConditionalDelete, ConditionalWrite, LibSqlProductRepository, ProductRepository,
};
