pub mod config;
pub mod consts;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod preprocess;
pub mod ranges;
pub mod region;
pub mod sidecar;
pub mod unmix;
