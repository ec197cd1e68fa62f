//! Filename-driven resolution of the tag id, datetime rule and entity name.
//!
//! Tag and datetime extraction are best effort: a pattern that does not
//! compile or does not match leaves the configured value in place. The
//! outcome is reported as a [`Resolution`] so callers can tell a captured
//! value from a fallback.

use regex::Regex;
use thiserror::Error;

use crate::{
    observability::{log_debug, log_error, log_warn},
    option::{ConfigError, DatatimeMode, ParserOptions, TagIdMode, FILE_NAME_FORMAT},
};

/// Why a filename capture produced no value.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern does not compile.
    #[error("invalid pattern: {0}")]
    Invalid(#[from] regex::Error),
    /// The pattern compiles but has no capture group 1.
    #[error("pattern {0:?} has no capture group")]
    NoCaptureGroup(String),
}

/// How a resolved value was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Taken literally from configuration.
    Configured,
    /// Captured from the filename.
    Captured,
    /// The pattern did not match; the configured value is kept.
    NoMatch,
    /// The pattern was unusable; the configured value is kept.
    InvalidPattern,
}

/// A value together with the way it was resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// The resolved value.
    pub value: String,
    /// Where the value came from.
    pub resolution: Resolution,
}

impl Resolved {
    fn configured(value: &str) -> Self {
        Self {
            value: value.to_string(),
            resolution: Resolution::Configured,
        }
    }

    /// Whether the value was taken from the configuration as a fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self.resolution,
            Resolution::NoMatch | Resolution::InvalidPattern
        )
    }
}

/// Search `haystack` for `pattern` and return capture group 1 of the first match.
pub fn find_capture(pattern: &str, haystack: &str) -> Result<Option<String>, PatternError> {
    let regex = compile_with_group(pattern)?;
    Ok(regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|group| group.as_str().to_string()))
}

/// Like [`find_capture`], but `pattern` must match the whole of `haystack`.
pub fn full_capture(pattern: &str, haystack: &str) -> Result<Option<String>, PatternError> {
    compile_with_group(pattern)?;
    let anchored = compile_with_group(&format!("^(?:{pattern})$"))?;
    Ok(anchored
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|group| group.as_str().to_string()))
}

fn compile_with_group(pattern: &str) -> Result<Regex, PatternError> {
    let regex = Regex::new(pattern)?;
    if regex.captures_len() < 2 {
        return Err(PatternError::NoCaptureGroup(pattern.to_string()));
    }
    Ok(regex)
}

/// Capture from `filename` with `pattern`, keeping `pattern` itself as the
/// value when the capture fails.
pub fn capture_or_configured(field: &'static str, pattern: &str, filename: &str) -> Resolved {
    match find_capture(pattern, filename) {
        Ok(Some(value)) => Resolved {
            value,
            resolution: Resolution::Captured,
        },
        Ok(None) => {
            log_warn!(
                component = "resolve",
                event = "pattern_no_match",
                field,
                pattern,
                filename,
                "keeping configured value"
            );
            Resolved {
                value: pattern.to_string(),
                resolution: Resolution::NoMatch,
            }
        }
        Err(err) => {
            log_warn!(
                component = "resolve",
                event = "pattern_invalid",
                field,
                pattern,
                filename,
                error = %err,
                "keeping configured value"
            );
            Resolved {
                value: pattern.to_string(),
                resolution: Resolution::InvalidPattern,
            }
        }
    }
}

/// Resolve the schema identifier of `filename`.
pub fn resolve_tag_id(options: &ParserOptions, filename: &str) -> Resolved {
    match options.tag_id_mode {
        TagIdMode::FromConfig => Resolved::configured(&options.tag_id),
        TagIdMode::FromFilename => capture_or_configured("tag_id", &options.tag_id, filename),
    }
}

/// Per-file rule for filling the `DATETIME_ID` system field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatetimeRule {
    /// No datetime field.
    Disabled,
    /// Copy the value of the column whose key matches, ignoring case.
    Column(String),
    /// The same value on every record.
    Fixed(Resolved),
}

impl DatetimeRule {
    /// Datetime value contributed by the field `key` = `value`, if any.
    pub fn value_for<'a>(&'a self, key: &str, value: &'a str) -> Option<&'a str> {
        match self {
            DatetimeRule::Disabled => None,
            DatetimeRule::Column(column) if key.eq_ignore_ascii_case(column) => {
                Some(value.trim())
            }
            DatetimeRule::Column(_) => None,
            DatetimeRule::Fixed(resolved) => Some(&resolved.value),
        }
    }
}

/// Resolve the datetime rule for `filename`.
pub fn resolve_datetime(options: &ParserOptions, filename: &str) -> DatetimeRule {
    match options.datatime_mode {
        DatatimeMode::Disabled => DatetimeRule::Disabled,
        DatatimeMode::FromColumn => DatetimeRule::Column(options.datatime_column.clone()),
        DatatimeMode::FromFilename => DatetimeRule::Fixed(capture_or_configured(
            "datatime_column",
            &options.datatime_column,
            filename,
        )),
    }
}

/// Result of matching the filename against the entity-name pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityName {
    /// No pattern configured.
    Unconfigured,
    /// The filename matched; the token is capture group 1.
    Matched(String),
    /// The filename did not match; the file must be skipped.
    Mismatch,
}

impl EntityName {
    /// The captured entity token, if the pattern matched.
    pub fn token(&self) -> Option<&str> {
        match self {
            EntityName::Matched(token) => Some(token),
            _ => None,
        }
    }
}

/// Match `filename` in full against the configured entity-name pattern.
pub fn resolve_entity_name(
    options: &ParserOptions,
    filename: &str,
) -> Result<EntityName, ConfigError> {
    let Some(pattern) = options.file_name_format.as_deref() else {
        return Ok(EntityName::Unconfigured);
    };
    let captured = full_capture(pattern, filename).map_err(|err| {
        log_error!(
            component = "resolve",
            event = "entity_pattern_unusable",
            filename,
            pattern,
            error = %err,
        );
        entity_pattern_error(pattern, err)
    })?;
    Ok(match captured {
        Some(token) => {
            log_debug!(
                component = "resolve",
                event = "entity_name_matched",
                filename,
                token = %token,
            );
            EntityName::Matched(token)
        }
        None => EntityName::Mismatch,
    })
}

fn entity_pattern_error(pattern: &str, err: PatternError) -> ConfigError {
    match err {
        PatternError::Invalid(source) => ConfigError::InvalidPattern {
            key: FILE_NAME_FORMAT,
            pattern: pattern.to_string(),
            source,
        },
        PatternError::NoCaptureGroup(pattern) => ConfigError::MissingCaptureGroup {
            key: FILE_NAME_FORMAT,
            pattern,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_pattern_captures_whole_filename() {
        let options = ParserOptions::default();
        let tag = resolve_tag_id(&options, "DIM_E_SGEH_SGSN.Topology.23052011");
        assert_eq!(tag.value, "DIM_E_SGEH_SGSN.Topology.23052011");
        assert_eq!(tag.resolution, Resolution::Captured);
        assert!(!tag.is_fallback());
    }

    #[test]
    fn tag_pattern_captures_group_one() {
        let options =
            ParserOptions::default().tag_id(TagIdMode::FromFilename, r"^(\w+)\.Topology");
        let tag = resolve_tag_id(&options, "DIM_E_SGEH_SGSN.Topology.23052011");
        assert_eq!(tag.value, "DIM_E_SGEH_SGSN");
    }

    #[test]
    fn tag_falls_back_to_configured_value_on_no_match() {
        let options = ParserOptions::default().tag_id(TagIdMode::FromFilename, r"^X(\d+)");
        let tag = resolve_tag_id(&options, "plain.txt");
        assert_eq!(tag.value, r"^X(\d+)");
        assert_eq!(tag.resolution, Resolution::NoMatch);
        assert!(tag.is_fallback());
    }

    #[test]
    fn tag_falls_back_on_malformed_pattern() {
        let options = ParserOptions::default().tag_id(TagIdMode::FromFilename, "(unclosed");
        let tag = resolve_tag_id(&options, "file");
        assert_eq!(tag.value, "(unclosed");
        assert_eq!(tag.resolution, Resolution::InvalidPattern);
    }

    #[test]
    fn tag_without_group_is_unusable() {
        let options = ParserOptions::default().tag_id(TagIdMode::FromFilename, "file");
        let tag = resolve_tag_id(&options, "file");
        assert_eq!(tag.resolution, Resolution::InvalidPattern);
    }

    #[test]
    fn literal_tag_is_configured() {
        let options = ParserOptions::default().tag_id(TagIdMode::FromConfig, "(.+)");
        let tag = resolve_tag_id(&options, "anything");
        assert_eq!(tag.value, "(.+)");
        assert_eq!(tag.resolution, Resolution::Configured);
    }

    #[test]
    fn datetime_from_filename_is_fixed() {
        let options =
            ParserOptions::default().datatime(DatatimeMode::FromFilename, r"_(\d{12})\.txt$");
        let rule = resolve_datetime(&options, "node_202401011200.txt");
        assert_eq!(rule.value_for("any", "x"), Some("202401011200"));
    }

    #[test]
    fn datetime_column_matches_ignoring_case() {
        let options = ParserOptions::default().datatime(DatatimeMode::FromColumn, "Timestamp");
        let rule = resolve_datetime(&options, "file");
        assert_eq!(rule.value_for("TIMESTAMP", " 2011-05-23 "), Some("2011-05-23"));
        assert_eq!(rule.value_for("other", "x"), None);
    }

    #[test]
    fn datetime_disabled_contributes_nothing() {
        let rule = resolve_datetime(&ParserOptions::default(), "file");
        assert_eq!(rule, DatetimeRule::Disabled);
        assert_eq!(rule.value_for("0", "x"), None);
    }

    #[test]
    fn entity_name_requires_full_match() {
        let options = ParserOptions::default().file_name_format(r"A\d+_(\w+)\.xml");
        assert_eq!(
            resolve_entity_name(&options, "A20240101_ERBS01.xml").expect("valid pattern"),
            EntityName::Matched("ERBS01".to_string())
        );
        assert_eq!(
            resolve_entity_name(&options, "xA20240101_ERBS01.xml.gz").expect("valid pattern"),
            EntityName::Mismatch
        );
    }

    #[test]
    fn entity_name_unconfigured() {
        let name = resolve_entity_name(&ParserOptions::default(), "f").expect("no pattern");
        assert_eq!(name, EntityName::Unconfigured);
        assert_eq!(name.token(), None);
    }

    #[test]
    fn malformed_entity_pattern_is_config_error() {
        let options = ParserOptions::default().file_name_format("([a-z");
        let err = resolve_entity_name(&options, "abc").expect_err("bad pattern");
        assert!(matches!(
            err,
            ConfigError::InvalidPattern {
                key: FILE_NAME_FORMAT,
                ..
            }
        ));
    }

    #[test]
    fn entity_pattern_without_group_is_config_error() {
        let options = ParserOptions::default().file_name_format("abc");
        let err = resolve_entity_name(&options, "abc").expect_err("no group");
        assert!(matches!(err, ConfigError::MissingCaptureGroup { .. }));
    }

    #[test]
    fn full_capture_respects_alternation() {
        assert_eq!(
            full_capture("(a)|b", "ab").expect("compiles"),
            None,
            "alternation must not escape the anchors"
        );
        assert_eq!(full_capture("(a)|b", "a").expect("compiles"), Some("a".into()));
    }
}
