//! Names of Atari environments.
use crate::error::CurioError;

/// Builds the name of an Atari environment without frame skipping.
///
/// ```rust
/// use curio_core::env_name::atari_env_name;
///
/// assert_eq!(atari_env_name("pong", 4).unwrap(), "PongNoFrameskip-v4");
/// assert!(atari_env_name("pong", 3).is_err());
/// ```
pub fn atari_env_name(game: &str, variant: u8) -> Result<String, CurioError> {
    if variant != 0 && variant != 4 {
        return Err(CurioError::InvalidEnvVariant(variant));
    }
    Ok(format!("{}NoFrameskip-v{}", capitalize(game), variant))
}

// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
