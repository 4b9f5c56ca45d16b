//! Feature preprocessing applied inside the trained pipeline

mod scaler;

pub use scaler::StandardScaler;
