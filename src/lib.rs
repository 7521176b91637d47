pub mod api;
pub mod config;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod rag;
pub mod state;
pub mod storage;
