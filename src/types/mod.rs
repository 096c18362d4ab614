pub mod analysis;
pub mod request;
pub mod run;
pub mod source;
