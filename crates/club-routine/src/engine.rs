//! The 35-step routine state machine (spec §4.6). Pure: all I/O (the tool
//! calls that inform a transition decision) happens outside the engine; the
//! engine only holds step text and the transition table.

use serde::{Deserialize, Serialize};

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 35;

/// Server-internal age-routing hop. Spec: "age_group >= U16 -> 23, else -> 28".
pub const AGE_HOP_STEP: u8 = 22;
pub const AGE_HOP_OVER_16_TARGET: u8 = 23;
pub const AGE_HOP_UNDER_16_TARGET: u8 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineStep {
    pub number: u8,
    pub instruction_text: &'static str,
    pub server_internal: bool,
}

/// Facts a caller supplies so the engine can resolve a data-dependent
/// transition. The engine consults only the fields relevant to the step
/// being evaluated; tool calls that produce these facts happen in the
/// dispatcher/model loop, never inside the engine itself.
#[derive(Debug, Clone, Default)]
pub struct RoutineContext {
    /// Result of `check_if_record_exists_in_db` at step 2.
    pub record_found: Option<bool>,
    pub played_last_season: Option<bool>,
    /// Result of `check_if_kit_needed`, consulted at steps 2 and 30.
    pub kit_needed: Option<bool>,
    /// Whether the computed age group is U16 or older, consulted at the
    /// step-22 server-internal hop.
    pub age_group_u16_plus: Option<bool>,
    /// Whether the parent's address lookup succeeded, consulted at step 14.
    pub address_lookup_succeeded: Option<bool>,
    /// Answer to "same address as parent?", consulted at step 16.
    pub same_address_as_parent: Option<bool>,
}

const STEPS: &[(u8, &str)] = &[
    (1, "Ask for the parent's first and last name."),
    (2, "Ask for the child's first and last name."),
    (3, "Ask for the child's date of birth."),
    (4, "Ask for the child's gender."),
    (5, "Ask whether the child has any medical issues the club should know about."),
    (6, "Ask which team the child played for last season, if any."),
    (7, "Ask the parent's relationship to the child."),
    (8, "Ask for the parent's UK mobile number."),
    (9, "Ask for the parent's email address."),
    (10, "Ask whether the parent consents to club communications."),
    (11, "Ask for the parent's date of birth."),
    (12, "Ask for the parent's home postcode."),
    (13, "Ask for the parent's house number or name."),
    (14, "Look up the address from postcode and house number; on failure ask for it manually."),
    (15, "Confirm the looked-up or manually entered parent address."),
    (16, "Ask whether the child lives at the same address as the parent."),
    (18, "Ask for the child's home postcode."),
    (19, "Ask for the child's house number or name."),
    (20, "Look up the child's address from postcode and house number; on failure ask for it manually."),
    (21, "Confirm the child's address."),
    (22, "Route internally based on the child's age group."),
    (23, "Ask for the player's own mobile number."),
    (24, "Ask for the player's own email address."),
    (25, "Summarize all collected details for confirmation."),
    (26, "Ask the parent to confirm the summary is correct."),
    (27, "Collect any corrections to the summary."),
    (28, "Confirm readiness to proceed to payment setup."),
    (29, "Create the payment token, persist registration details, and text the payment link."),
    (30, "Route based on whether kit is required."),
    (32, "Ask for the required kit size."),
    (33, "Ask for a preferred shirt number and check its availability."),
    (34, "Ask the parent to upload a clear photo of the child."),
    (35, "Thank the parent; registration is complete."),
];

/// Whether an age-group label (`"U9"`, `"Open Age"`, `"mens"`, ...) is U16
/// or older, for the step-22 server-internal hop. Non-numeric labels
/// (open age, mens) are always treated as over the line.
pub fn age_group_is_u16_plus(age_group: &str) -> bool {
    age_group
        .trim_start_matches(['U', 'u'])
        .parse::<u8>()
        .map(|n| n >= 16)
        .unwrap_or(true)
}

pub fn instruction_text(n: u8) -> Option<&'static str> {
    STEPS.iter().find(|(num, _)| *num == n).map(|(_, text)| *text)
}

pub fn step(n: u8) -> Option<RoutineStep> {
    instruction_text(n).map(|text| RoutineStep {
        number: n,
        instruction_text: text,
        server_internal: n == AGE_HOP_STEP,
    })
}

/// Default next state when the model marks the user's input invalid:
/// almost always the same step, so the user is re-prompted.
pub fn on_invalid(n: u8) -> u8 {
    n
}

/// Next state on successful validation/completion of step `n`, given the
/// accumulated context. Returns `None` only for the terminal step.
pub fn on_valid(n: u8, ctx: &RoutineContext) -> Option<u8> {
    match n {
        2 => Some(match (ctx.record_found, ctx.played_last_season, ctx.kit_needed) {
            (Some(false), _, _) => 3,
            (Some(true), Some(false), _) => 32,
            (Some(true), Some(true), Some(true)) => 32,
            (Some(true), Some(true), Some(false)) => 34,
            // Facts not yet resolved: stay put until the tool call completes.
            _ => 2,
        }),
        14 => Some(match ctx.address_lookup_succeeded {
            Some(false) => 14,
            _ => 15,
        }),
        16 => Some(match ctx.same_address_as_parent {
            Some(true) => 22,
            Some(false) => 18,
            None => 16,
        }),
        20 => Some(match ctx.address_lookup_succeeded {
            Some(false) => 20,
            _ => 21,
        }),
        22 => Some(match ctx.age_group_u16_plus {
            Some(true) => AGE_HOP_OVER_16_TARGET,
            Some(false) => AGE_HOP_UNDER_16_TARGET,
            None => AGE_HOP_UNDER_16_TARGET,
        }),
        30 => Some(match ctx.kit_needed {
            Some(true) => 32,
            _ => 34,
        }),
        35 => None,
        17 => Some(18),
        _ => Some(n + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_2_routes_not_found_to_step_3() {
        let ctx = RoutineContext {
            record_found: Some(false),
            ..Default::default()
        };
        assert_eq!(on_valid(2, &ctx), Some(3));
    }

    #[test]
    fn step_2_resume_needs_kit_routes_to_32() {
        let ctx = RoutineContext {
            record_found: Some(true),
            played_last_season: Some(true),
            kit_needed: Some(true),
            ..Default::default()
        };
        assert_eq!(on_valid(2, &ctx), Some(32));
    }

    #[test]
    fn step_2_resume_no_kit_skips_to_photo() {
        let ctx = RoutineContext {
            record_found: Some(true),
            played_last_season: Some(true),
            kit_needed: Some(false),
            ..Default::default()
        };
        assert_eq!(on_valid(2, &ctx), Some(34));
    }

    #[test]
    fn step_22_hop_routes_by_age() {
        let over16 = RoutineContext {
            age_group_u16_plus: Some(true),
            ..Default::default()
        };
        let under16 = RoutineContext {
            age_group_u16_plus: Some(false),
            ..Default::default()
        };
        assert_eq!(on_valid(22, &over16), Some(23));
        assert_eq!(on_valid(22, &under16), Some(28));
    }

    #[test]
    fn step_35_is_terminal() {
        assert_eq!(on_valid(35, &RoutineContext::default()), None);
    }

    #[test]
    fn on_invalid_is_idempotent() {
        assert_eq!(on_invalid(7), 7);
    }

    #[test]
    fn age_group_classification() {
        assert!(!age_group_is_u16_plus("U9"));
        assert!(age_group_is_u16_plus("U16"));
        assert!(age_group_is_u16_plus("U18"));
        assert!(age_group_is_u16_plus("Open Age"));
        assert!(age_group_is_u16_plus("mens"));
    }

    #[test]
    fn every_step_1_to_35_except_17_has_instruction_text() {
        for n in FIRST_STEP..=LAST_STEP {
            if n == 17 {
                continue;
            }
            assert!(instruction_text(n).is_some(), "missing instruction text for step {n}");
        }
    }
}
