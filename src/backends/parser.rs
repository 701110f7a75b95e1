//! Engine output parsing.
//!
//! The command-line scanner prints one tab-separated line per file:
//!
//! ```text
//! /malware/sample.exe	[OK]
//! /malware/eicar.com	EICAR test file NOT a virus.
//! ```
//!
//! The literal `[OK]` marker anywhere in the output means clean. Without
//! it, the second tab-delimited field is the threat name.

use crate::core::{Detection, EngineMetadata, ScanError, Verdict};

/// Marker token the engine prints for a clean file.
pub const CLEAN_MARKER: &str = "[OK]";

/// Parses raw engine output into a detection.
///
/// # Errors
///
/// Returns `MalformedOutput` when the marker is absent and there is no
/// non-empty second field to take the threat name from.
pub fn parse_detection(raw: &str) -> Result<Detection, ScanError> {
    tracing::debug!(output = %raw.trim_end(), "Engine output");

    if raw.contains(CLEAN_MARKER) {
        return Ok(Detection::Clean);
    }

    let threat = raw
        .split('\t')
        .nth(1)
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .ok_or_else(|| {
            ScanError::malformed(format!(
                "expected a tab-delimited detection field, got {:?}",
                truncate(raw, 120)
            ))
        })?;

    Ok(Detection::Infected {
        threat: threat.to_string(),
    })
}

/// Parses raw engine output into a verdict stamped with `metadata`.
pub fn parse_output(raw: &str, metadata: EngineMetadata) -> Result<Verdict, ScanError> {
    Verdict::from_detection(parse_detection(raw)?, metadata)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> EngineMetadata {
        EngineMetadata::new("6.0.4.564", "9324", "20260110")
    }

    #[test]
    fn test_clean_marker() {
        let verdict = parse_output("boot.exe\t[OK]", metadata()).unwrap();
        assert!(!verdict.is_infected());
        assert_eq!(verdict.threat_name(), "");
    }

    #[test]
    fn test_clean_marker_anywhere_wins() {
        let detection = parse_detection("scan summary [OK] no tab here").unwrap();
        assert!(detection.is_clean());
    }

    #[test]
    fn test_infected_threat_name() {
        let verdict = parse_output("boot.exe\tEICAR-Test-File", metadata()).unwrap();
        assert!(verdict.is_infected());
        assert_eq!(verdict.threat_name(), "EICAR-Test-File");
    }

    #[test]
    fn test_infected_threat_name_trimmed() {
        let detection =
            parse_detection("/malware/eicar.com\t  EICAR test file NOT a virus. \n").unwrap();
        assert_eq!(
            detection,
            Detection::Infected {
                threat: "EICAR test file NOT a virus.".into()
            }
        );
    }

    #[test]
    fn test_only_second_field_is_used() {
        let detection = parse_detection("a.exe\tW32/Generic\textra").unwrap();
        assert_eq!(
            detection,
            Detection::Infected {
                threat: "W32/Generic".into()
            }
        );
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = parse_detection("engine busy, try again").unwrap_err();
        assert!(err.is_recoverable());

        let err = parse_detection("").unwrap_err();
        assert!(matches!(err, ScanError::MalformedOutput { .. }));
    }

    #[test]
    fn test_empty_field_is_malformed() {
        assert!(parse_detection("boot.exe\t   \n").is_err());
    }

    #[test]
    fn test_metadata_is_stamped_for_both_outcomes() {
        let clean = parse_output("x\t[OK]", metadata()).unwrap();
        let infected = parse_output("x\tTrojan", metadata()).unwrap();
        assert_eq!(clean.metadata(), infected.metadata());
        assert_eq!(clean.definition_date(), "20260110");
    }
}
