pub mod agents;
pub mod config;
pub mod data_layer;
pub mod error;
pub mod execution;
pub mod llm;
pub mod observability;
pub mod profile;
pub mod sample_data;
pub mod validation;

pub use agents::{AgentOrchestrator, AgentState, QueryIntent};
pub use config::{LlmProvider, Settings};
pub use data_layer::DataLayer;
pub use error::{InsightsError, Result};
