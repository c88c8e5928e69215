//! Port traits: the seams between the domain and its collaborators.

pub mod classifier_port;
pub mod config_port;
pub mod data_port;
pub mod indicator_port;
pub mod output_port;
