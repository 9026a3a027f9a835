//! Data models for the gallery and contact endpoints.
//!
//! Nothing here is stored in a database: images are described by the files
//! in the gallery directory and contact messages live for one request.

pub mod contact;
pub mod image;
