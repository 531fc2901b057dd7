//! Marquee: a read-only catalog query service over a search index, with a
//! cache-aside layer in front of every read.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
