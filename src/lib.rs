pub mod config;
pub mod error;

pub mod entry;
pub mod reference;
pub mod visibility;

pub mod expand;
pub mod feed;
pub mod provider;
pub mod title;

pub mod curate;
pub mod db;
pub mod reply;
pub mod server;
pub mod store;
