pub mod normalizer;
pub mod structured;
pub mod token_estimator;
