//! Peak-hour, trip duration and fare estimates for taxi trips between two
//! zones, computed by three pre-trained models over derived trip features.

pub mod config;
pub mod context;
pub mod distance;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod speed;
pub mod types;
pub mod zones;

pub use context::EstimatorContext;
pub use error::EstimatorError;
pub use pipeline::estimate;
pub use types::{PredictionResult, TripRequest};
