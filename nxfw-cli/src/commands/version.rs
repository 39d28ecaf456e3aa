//! Version command - convert between packed and dotted versions.

use clap::Args;
use nxfw::PackedVersion;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Packed integer (e.g. 1207959552) or dotted version (e.g. 18.0.0)
    pub value: String,
}

/// Run the version command.
pub fn run(args: VersionArgs) -> Result<(), CliError> {
    let version = parse(&args.value)?;
    println!("raw:    {}", version.raw());
    println!("simple: {}", version.simple());
    println!("full:   {}", version.full());
    Ok(())
}

fn parse(value: &str) -> Result<PackedVersion, CliError> {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u32>()
            .map(PackedVersion::from_raw)
            .map_err(|e| CliError::Usage(format!("invalid packed version '{}': {}", value, e)));
    }
    value
        .parse::<PackedVersion>()
        .map_err(|e| CliError::Firmware(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_packed() {
        assert_eq!(parse("1207959552").unwrap().simple(), "18.0.0");
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(parse("17.0.1").unwrap().raw(), 0x4401_0000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("seventeen").is_err());
        assert!(matches!(parse("99999999999"), Err(CliError::Usage(_))));
    }
}
