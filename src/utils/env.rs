use tracing::debug;

/// Loads `.env` from the working directory, if there is one.
pub fn ensure_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(_) => debug!("no .env file loaded"),
    }
}
