pub mod config;
pub mod console;
pub mod dispatcher;
pub mod facts;
pub mod intent;
pub mod render;
pub mod responder;
pub mod router;
pub mod speech;
pub mod storage;
pub mod theme;
pub mod theme_store;
