pub mod env;
pub mod logging;

pub use env::ensure_dotenv;
pub use logging::init_tracing;
