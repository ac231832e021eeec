//! Command-line handling for the proxy binary.

use thiserror::Error;

pub const USAGE: &str = "Usage: steam-proxy <port>";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
    #[error("expected one parameter (what port to listen on)")]
    WrongCount,

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// Parse the process arguments (program name excluded) into the listen port
pub fn parse_port<I>(args: I) -> Result<u16, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let (Some(port), None) = (args.next(), args.next()) else {
        return Err(ArgsError::WrongCount);
    };

    match port.trim().parse::<u16>() {
        Ok(port) => Ok(port),
        Err(_) => Err(ArgsError::InvalidPort(port)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_port() {
        assert_eq!(parse_port(args(&["4242"])), Ok(4242));
    }

    #[test]
    fn test_missing_or_extra_arguments() {
        assert_eq!(parse_port(args(&[])), Err(ArgsError::WrongCount));
        assert_eq!(parse_port(args(&["1", "2"])), Err(ArgsError::WrongCount));
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(
            parse_port(args(&["http"])),
            Err(ArgsError::InvalidPort("http".to_string()))
        );
        assert!(parse_port(args(&["70000"])).is_err());
        assert!(parse_port(args(&["-1"])).is_err());
    }
}
