//! Perception collaborator implementations
//!
//! Available providers:
//! - HTTP inference server for captioning, translation and face verification
//! - External frame-grab command for the camera

mod camera;
mod http;

pub use camera::{CommandCamera, FamilyNamer, PromptNamer, choose_family_name};
pub use http::HttpPerceptionClient;
