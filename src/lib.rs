pub mod acquire;
pub mod artifact;
pub mod cmd;
pub mod convert;
pub mod deploy;
pub mod deps;
pub mod envconfig;
pub mod error;
pub mod format;
pub mod labels;
pub mod progress;
pub mod validate;

pub use acquire::{AcquireStrategy, Acquirer, ModelSource, RegistryRef};
pub use artifact::{ModelArtifact, ModelFormat};
pub use convert::{ConversionStage, ConvertOptions, Converter, INTERCHANGE_CHAIN};
pub use deploy::{DeployTarget, LABELS_FILENAME, MODEL_FILENAME};
pub use envconfig::PipelineConfig;
pub use error::PipelineError;
pub use labels::PIECE_LABELS;
