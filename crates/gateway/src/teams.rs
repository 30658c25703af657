//! Concrete `TeamResolver` backing the registration-code parser (C5), built
//! from the operator-configured team table in `Config` (see
//! `club_domain::config::TeamEntry`). Real team management is out of scope;
//! this is the operator-editable substitute the config layer carries.

use club_domain::config::TeamEntry;
use club_routine::code::{ResolvedTeam, TeamResolver};

pub struct ConfigTeamResolver<'a> {
    teams: &'a [TeamEntry],
}

impl<'a> ConfigTeamResolver<'a> {
    pub fn new(teams: &'a [TeamEntry]) -> Self {
        ConfigTeamResolver { teams }
    }
}

impl TeamResolver for ConfigTeamResolver<'_> {
    fn resolve(&self, team: &str, age: &str) -> Option<ResolvedTeam> {
        self.teams
            .iter()
            .find(|entry| entry.team.eq_ignore_ascii_case(team))
            .filter(|entry| entry.ages.iter().any(|a| a.eq_ignore_ascii_case(age)))
            .map(|entry| ResolvedTeam {
                team: entry.team.clone(),
                age_group: age.to_ascii_uppercase(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TeamEntry> {
        vec![TeamEntry {
            team: "Lions".to_string(),
            ages: vec!["U9".to_string(), "U10".to_string()],
        }]
    }

    #[test]
    fn resolves_known_team_age() {
        let teams = sample();
        let resolver = ConfigTeamResolver::new(&teams);
        let resolved = resolver.resolve("lions", "u10").unwrap();
        assert_eq!(resolved.team, "Lions");
        assert_eq!(resolved.age_group, "U10");
    }

    #[test]
    fn rejects_unknown_age_for_known_team() {
        let teams = sample();
        let resolver = ConfigTeamResolver::new(&teams);
        assert!(resolver.resolve("lions", "u18").is_none());
    }

    #[test]
    fn rejects_unknown_team() {
        let teams = sample();
        let resolver = ConfigTeamResolver::new(&teams);
        assert!(resolver.resolve("tigers", "u10").is_none());
    }
}
