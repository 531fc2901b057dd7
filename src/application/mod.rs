//! Application services layer.

pub mod access;
pub mod catalog;
pub mod error;
pub mod pagination;
pub mod query;
pub mod repos;
