pub mod chat_controller;
pub mod conversation_controller;
pub mod model_controller;
