//! BST Common Types
//!
//! Shared types used by the gateway and by clients of its HTTP API.

pub mod capability;
pub mod predict;

pub use capability::Permission;
pub use predict::{
    AuthInfo, PoseSequenceRequest, PredictionMetadata, PredictionResponse, TopPredictions,
};
