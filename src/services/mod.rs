// AIGard Core Services

pub mod config_store;
pub mod detection;
pub mod providers;
pub mod text_processor;

pub use config_store::*;
pub use providers::*;
pub use text_processor::*;

pub use detection::{Detector, ExternalClassifier, MistralClassifier, NeutralClassifier};
