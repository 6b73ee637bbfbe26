pub mod filename;
pub mod image_host;
pub mod metadata_store;
pub mod upload_service;
