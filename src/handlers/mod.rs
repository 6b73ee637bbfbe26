pub mod health_handlers;
pub mod template_handlers;
pub mod upload_handlers;
