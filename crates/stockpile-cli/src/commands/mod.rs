pub mod add;
pub mod common;
pub mod delete;
pub mod get;
pub mod list;
pub mod queue;
pub mod update;
