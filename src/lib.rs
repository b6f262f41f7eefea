pub mod agents;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod http_client;
pub mod insider;
pub mod ledger;
pub mod llm;
pub mod master;
pub mod meteorologist;
pub mod normalize;
pub mod pipeline;
pub mod scout;
pub mod season;
pub mod server;
pub mod sportradar;
pub mod stadiums;
pub mod tank01;
pub mod tts;
pub mod weather;
