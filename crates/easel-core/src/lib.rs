pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::EditorConfig;
pub use error::EaselError;
pub use logging::init_tracing;
pub use result::EaselResult;
