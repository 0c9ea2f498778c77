pub mod age_verify;
pub mod audit;
pub mod chat;
pub mod classify_debug;
pub mod health;
pub mod personality;
pub mod session;
