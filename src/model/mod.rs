// Model module - trained fall-model artifacts
//
// - artifact: ModelArtifact (scaler + logistic or tree-ensemble model)
// - registry: ModelRegistry (directory loading, hot swap, introspection)

mod artifact;
mod registry;

pub use artifact::{DecisionTree, ModelArtifact, ModelKind, Scaler, TreeNode};
pub use registry::{ModelInfo, ModelRegistry};
