pub mod chat_service;
pub mod knowledge;
pub mod persona;
pub mod sse;
