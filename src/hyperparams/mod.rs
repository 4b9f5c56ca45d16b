//! Hyperparameter typing and validation
//!
//! Raw `--param` strings are parsed into [`ParamValue`]s against a closed
//! allow-list per model family. Profile-supplied values are already typed
//! and go through [`HyperparamValidator::check_typed`].

mod spec;
mod validator;
mod value;

pub use spec::{ParamSpec, ParamType, RangeCheck};
pub use validator::HyperparamValidator;
pub use value::{ParamValue, TypedHyperparameters};

pub use spec::{LINEAR_SVC_PARAMS, LOGISTIC_REGRESSION_PARAMS, RANDOM_FOREST_PARAMS};
