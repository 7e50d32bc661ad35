//! HTTP surface of the chat service: conversation CRUD, budgeted message
//! sending (blocking and SSE), model listing, and usage reporting.

pub mod controllers;
pub mod dto;
pub mod error;
pub mod server;
pub mod services;

pub use error::{AppError, Result};
pub use server::{app_config, run, AppState};
pub use services::chat_service::ChatService;
