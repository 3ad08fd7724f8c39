//! Stremio metadata addon backed by TMDB: resolves ids, fetches movie and
//! series records, and normalizes them into the addon's meta format.

pub mod app;
pub mod config;
pub mod episodes;
pub mod handler;
pub mod kind;
pub mod manifest;
pub mod meta;
pub mod normalize;
pub mod resolve;
pub mod sort;
pub mod tmdb;
