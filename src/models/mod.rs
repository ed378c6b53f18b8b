pub mod biblioteca;
pub mod chat;
pub mod consulta;
pub mod notification;
pub mod response;
pub mod search;
pub mod settings;
pub mod user;
pub mod usuario;
