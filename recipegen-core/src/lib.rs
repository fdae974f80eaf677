pub mod config;
pub mod decoder;
pub mod error;
pub mod generator;
pub mod http_client;
pub mod model;
pub mod normalizer;
pub mod prompt;
pub mod reassembler;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod transport;
