use std::{env, fs};

use tracing::{debug, error};

/// Reads a secret from the file named by `file_var`, falling back to the
/// value of `value_var` when no file is configured.
///
/// Blank secrets count as unset.
pub fn get_secret(file_var: &str, value_var: &str) -> Option<String> {
    let secret = match env::var(file_var) {
        Ok(path) => match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(%file_var, "Secret read from file");
                content
            }
            Err(e) => {
                error!(%path, error = %e, "Failed to read secret file");
                return None;
            }
        },
        Err(_) => env::var(value_var).ok()?,
    };

    let secret = secret.trim();
    (!secret.is_empty()).then(|| secret.to_string())
}
