//! json5 0.4.1 carries location info in its errors, but its
//! `Display` implementation does not show it. Wrap it so that config
//! errors point at the offending line.

use std::fmt::Display;

use json5::Location;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub struct Json5FromStrError(pub json5::Error);

impl Json5FromStrError {
    pub fn message_without_location(&self) -> &str {
        match &self.0 {
            json5::Error::Message { msg, location: _ } => msg,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match &self.0 {
            json5::Error::Message { msg: _, location } => location.as_ref(),
        }
    }
}

impl Display for Json5FromStrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = self.message_without_location();
        if let Some(Location { line, column }) = self.location() {
            write!(f, "{msg} at line:column {line}:{column}")
        } else {
            write!(f, "{msg}")
        }
    }
}

pub fn json5_from_str<'t, T: Deserialize<'t>>(s: &'t str) -> Result<T, Json5FromStrError> {
    json5::from_str(s).map_err(Json5FromStrError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_error_shows_location() {
        let r: Result<Vec<u32>, _> = json5_from_str("[1,\n 2,\n x]");
        let e = r.unwrap_err();
        assert!(e.location().is_some());
        assert!(e.to_string().contains("line:column 3:"), "{e}");
    }
}
