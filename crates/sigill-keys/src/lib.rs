#![forbid(unsafe_code)]

//! Key management for sigill.
//!
//! Loads keys from PEM and DER, keeps them in a [`KeysManager`], models
//! `<KeyInfo>` content as descriptors and resolves descriptors to keys.

pub mod key;
pub mod keyinfo;
pub mod loader;
pub mod manager;
pub mod resolver;

pub use key::{Key, KeyData, KeyUsage};
pub use keyinfo::{KeyInfoItem, KeyInfoList};
pub use manager::KeysManager;
pub use resolver::{KeyInfoResolver, KeysManagerResolver};
