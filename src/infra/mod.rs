//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod datafile;
pub mod document_file;
pub mod error;
pub mod fonts;
pub mod http;
pub mod plex;
pub mod preferences;
pub mod render;
pub mod telemetry;
pub mod yaml_layout;
