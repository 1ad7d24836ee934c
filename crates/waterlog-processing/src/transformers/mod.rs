//! Fitted feature transformers.
//!
//! - [`LabelEncoder`]: category string to sorted integer code
//! - [`StandardScaler`]: zero mean, unit population variance

mod label_encoder;
mod standard_scaler;

pub use label_encoder::LabelEncoder;
pub use standard_scaler::StandardScaler;
