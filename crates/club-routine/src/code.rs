//! Registration-code grammar, classification and validation (spec §4.5).

use club_domain::session::{Classification, CodeContext};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCode {
    pub series: String,
    pub team: String,
    pub age: String,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    NoMatch,
    UnknownSeriesPrefix(char),
    SeasonMismatch { expected: String, found: String },
    UnknownTeamAge { team: String, age: String },
}

impl std::fmt::Display for CodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeError::NoMatch => write!(f, "does not match the registration code grammar"),
            CodeError::UnknownSeriesPrefix(c) => write!(f, "unknown series prefix '{c}'"),
            CodeError::SeasonMismatch { expected, found } => {
                write!(f, "season {found} does not match current season {expected}")
            }
            CodeError::UnknownTeamAge { team, age } => {
                write!(f, "team '{team}' age '{age}' is not a recognized team/age combination")
            }
        }
    }
}

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([0-9]{3})-([A-Za-z]+)-(U[0-9]{1,2}|open)-([0-9]{4})$").unwrap()
    })
}

/// Pure grammar parse: case-insensitive, leading/trailing whitespace
/// stripped. Does not check season or team/age validity.
pub fn parse(input: &str) -> Result<RawCode, CodeError> {
    let trimmed = input.trim();
    let caps = grammar().captures(trimmed).ok_or(CodeError::NoMatch)?;
    Ok(RawCode {
        series: caps[1].to_string(),
        team: caps[2].to_string(),
        age: normalize_age(&caps[3]),
        season: caps[4].to_string(),
    })
}

fn normalize_age(age: &str) -> String {
    if age.eq_ignore_ascii_case("open") {
        "open".to_string()
    } else {
        age.to_ascii_uppercase()
    }
}

pub fn classify(raw: &RawCode) -> Result<Classification, CodeError> {
    match raw.series.chars().next() {
        Some('1') => Ok(Classification::ReRegistration),
        Some('2') => Ok(Classification::NewRegistration),
        Some(other) => Err(CodeError::UnknownSeriesPrefix(other)),
        None => Err(CodeError::NoMatch),
    }
}

/// Resolves `(team, age)` against the team table. `mens` is accepted with
/// any age and always resolves to the "Open Age" row.
pub trait TeamResolver {
    fn resolve(&self, team: &str, age: &str) -> Option<ResolvedTeam>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTeam {
    pub team: String,
    pub age_group: String,
}

/// Parses and fully validates a registration code string against the
/// current season and a team table, producing the immutable `CodeContext`
/// a session attaches once a code is accepted.
pub fn parse_and_validate(
    input: &str,
    current_season: &str,
    resolver: &dyn TeamResolver,
) -> Result<CodeContext, CodeError> {
    let raw = parse(input)?;
    let classification = classify(&raw)?;

    if raw.season != current_season {
        return Err(CodeError::SeasonMismatch {
            expected: current_season.to_string(),
            found: raw.season.clone(),
        });
    }

    let resolved = if raw.team.eq_ignore_ascii_case("mens") {
        ResolvedTeam {
            team: "mens".to_string(),
            age_group: "Open Age".to_string(),
        }
    } else {
        resolver.resolve(&raw.team, &raw.age).ok_or_else(|| CodeError::UnknownTeamAge {
            team: raw.team.clone(),
            age: raw.age.clone(),
        })?
    };

    Ok(CodeContext {
        series: raw.series,
        team: resolved.team,
        age_group: resolved.age_group,
        season: raw.season,
        classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeResolver;
    impl TeamResolver for FakeResolver {
        fn resolve(&self, team: &str, age: &str) -> Option<ResolvedTeam> {
            if team.eq_ignore_ascii_case("lions") && (age == "U9" || age == "U10") {
                Some(ResolvedTeam {
                    team: "Lions".to_string(),
                    age_group: age.to_string(),
                })
            } else {
                None
            }
        }
    }

    #[test]
    fn parses_new_registration() {
        let raw = parse("200-Lions-U10-2526").unwrap();
        assert_eq!(raw.team, "Lions");
        assert_eq!(raw.age, "U10");
        assert_eq!(classify(&raw).unwrap(), Classification::NewRegistration);
    }

    #[test]
    fn parses_re_registration() {
        let raw = parse("100-Lions-U10-2526").unwrap();
        assert_eq!(classify(&raw).unwrap(), Classification::ReRegistration);
    }

    #[test]
    fn stable_under_case_and_whitespace() {
        let a = parse("  200-lions-u10-2526  ").unwrap();
        let b = parse("200-LIONS-U10-2526").unwrap();
        assert_eq!(a.team.to_lowercase(), b.team.to_lowercase());
        assert_eq!(a.age, b.age);
        assert_eq!(classify(&a), classify(&b));
    }

    #[test]
    fn rejects_unknown_series_prefix() {
        let raw = parse("300-Lions-U10-2526").unwrap();
        assert!(matches!(classify(&raw), Err(CodeError::UnknownSeriesPrefix('3'))));
    }

    #[test]
    fn rejects_malformed_code() {
        assert!(parse("not-a-code").is_err());
        assert!(parse("20-Lions-U10-2526").is_err());
    }

    #[test]
    fn mens_accepts_any_age() {
        let ctx = parse_and_validate("200-mens-U99-2526", "2526", &FakeResolver).unwrap();
        assert_eq!(ctx.age_group, "Open Age");
    }

    #[test]
    fn rejects_season_mismatch() {
        let err = parse_and_validate("200-Lions-U10-2425", "2526", &FakeResolver).unwrap_err();
        assert!(matches!(err, CodeError::SeasonMismatch { .. }));
    }

    #[test]
    fn rejects_unresolvable_team_age() {
        let err = parse_and_validate("200-Tigers-U10-2526", "2526", &FakeResolver).unwrap_err();
        assert!(matches!(err, CodeError::UnknownTeamAge { .. }));
    }
}
