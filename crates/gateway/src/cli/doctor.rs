use std::sync::Arc;

use club_domain::config::{Config, ConfigSeverity};
use club_providers::HealthStatus;

use crate::state::AppState;

/// Runs all diagnostic checks and prints a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("club-gateway doctor");
    println!("====================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_teams(config, &mut all_passed);

    let state = AppState::from_config(Arc::new(config.clone()));
    check_adapters(&state, &mut all_passed).await;

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {}", issue.message);
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_teams(config: &Config, all_passed: &mut bool) {
    let count = config.teams.len();
    let ok = count > 0;
    print_check(
        "Team table configured",
        ok,
        if ok { format!("{count} team(s)") } else { "none configured".into() },
    );
    if !ok {
        *all_passed = false;
    }
}

async fn check_adapters(state: &AppState, all_passed: &mut bool) {
    for (name, status) in state.adapter_health().await {
        let ok = matches!(status, HealthStatus::Healthy);
        print_check(
            &format!("Adapter: {name}"),
            ok,
            match status {
                HealthStatus::Healthy => "healthy".to_string(),
                HealthStatus::Degraded => "degraded".to_string(),
                HealthStatus::Unreachable => "unreachable".to_string(),
            },
        );
        if !ok {
            *all_passed = false;
        }
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
