pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod flickr;
pub mod image_fetch;
pub mod output;
pub mod store;
