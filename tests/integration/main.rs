//! Integration tests with mock HTTP servers

mod config;
mod generation;
mod mock_server;
mod stt;
