//! Web service for editing title card series configuration and previewing cards.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
