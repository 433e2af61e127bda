pub mod chat_service;
pub mod chat_session;
