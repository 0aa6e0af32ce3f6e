//! Background services

pub mod purge;

pub use purge::{purge_once, spawn_purge_task};
