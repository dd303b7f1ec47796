#[macro_use]
extern crate lazy_static;

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod sql;
pub mod util;
