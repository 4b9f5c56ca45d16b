//! Model training
//!
//! The estimators behind the three supported families, the scaler +
//! classifier pipeline persisted as `model.pkl`, the deterministic 80/20
//! split and the end-to-end [`TrainingRunner`].

pub mod decision_tree;
pub mod estimator;
pub mod linear_models;
pub mod pipeline;
pub mod random_forest;
pub mod runner;
pub mod split;
pub mod svm;

pub use decision_tree::{DecisionTree, TreeNode};
pub use estimator::{create_estimator, Capabilities, Classifier, Estimator, LinearCoefficients, ModelFamily};
pub use linear_models::LogisticRegression;
pub use pipeline::{Pipeline, StepInfo, CLASSIFIER_STEP, SCALER_STEP};
pub use random_forest::RandomForest;
pub use runner::{apply_preset_defaults, RunOutcome, TrainRequest, TrainingRunner};
pub use split::{train_val_split, validation_size, TrainValSplit, VALIDATION_FRACTION};
pub use svm::LinearSvc;
