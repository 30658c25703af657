//! Agent variants (spec §4.4). Plain data records — no inheritance, no
//! mutable per-variant state. `resolve` is the only place that combines a
//! variant with a step's instruction text.

use club_domain::tool::ToolId;
use std::collections::HashSet;

pub const STEP_PLACEHOLDER: &str = "{{STEP_INSTRUCTION}}";

/// Role-specific opener injected the first time a session transitions into
/// re-registration off a freshly parsed code (spec §4.7 step 4).
pub const RE_REGISTRATION_OPENER: &str =
    "Welcome the returning parent back, confirm the player's name, and ask whether their address has changed since last season.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentVariant {
    Generic,
    NewRegistration,
    ReRegistration,
}

impl AgentVariant {
    pub fn name(self) -> &'static str {
        match self {
            AgentVariant::Generic => "generic",
            AgentVariant::NewRegistration => "new_registration",
            AgentVariant::ReRegistration => "re_registration",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "generic" => AgentVariant::Generic,
            "new_registration" => AgentVariant::NewRegistration,
            "re_registration" => AgentVariant::ReRegistration,
            _ => return None,
        })
    }

    fn base_instructions(self) -> &'static str {
        match self {
            AgentVariant::Generic => {
                "You are the club registration assistant. Answer general questions \
                 about the club and watch for a registration code of the form \
                 SERIES-TEAM-AGE-SEASON in the user's message. You have no \
                 registration workflow tools beyond looking up whether a record \
                 already exists.\n\n{{STEP_INSTRUCTION}}"
            }
            AgentVariant::ReRegistration => {
                "You are guiding a returning parent through re-registration. \
                 Confirm and update their address details as needed.\n\n{{STEP_INSTRUCTION}}"
            }
            AgentVariant::NewRegistration => {
                "You are guiding a parent through a new player's registration, \
                 step by step. Follow the current step's instruction exactly and \
                 do not skip ahead.\n\n{{STEP_INSTRUCTION}}"
            }
        }
    }

    pub fn allowed_tools(self) -> HashSet<ToolId> {
        match self {
            AgentVariant::Generic => HashSet::from([ToolId::CheckIfRecordExistsInDb]),
            AgentVariant::ReRegistration => {
                HashSet::from([ToolId::AddressValidation, ToolId::AddressLookup])
            }
            AgentVariant::NewRegistration => HashSet::from([
                ToolId::PersonNameValidation,
                ToolId::ChildDobValidation,
                ToolId::MedicalIssuesValidation,
                ToolId::AddressLookup,
                ToolId::CheckIfRecordExistsInDb,
                ToolId::CheckIfKitNeeded,
                ToolId::CheckShirtNumberAvailability,
                ToolId::UpdateRegDetailsToDb,
                ToolId::UpdateKitDetailsToDb,
                ToolId::UpdatePhotoLinkToDb,
                ToolId::CreatePaymentToken,
                ToolId::CreateSignupPaymentLink,
                ToolId::SendSmsPaymentLink,
                ToolId::UploadPhotoToS3,
            ]),
        }
    }
}

/// Combines a variant with an optional step instruction, producing the
/// effective system prompt and the tool subset the model loop should offer.
pub fn resolve(variant: AgentVariant, step_text: Option<&str>) -> (String, HashSet<ToolId>) {
    let instructions = variant
        .base_instructions()
        .replace(STEP_PLACEHOLDER, step_text.unwrap_or(""));
    (instructions, variant.allowed_tools())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_has_minimal_tools() {
        let tools = AgentVariant::Generic.allowed_tools();
        assert_eq!(tools.len(), 1);
        assert!(tools.contains(&ToolId::CheckIfRecordExistsInDb));
    }

    #[test]
    fn new_registration_excludes_re_registration_only_tools() {
        let tools = AgentVariant::NewRegistration.allowed_tools();
        assert!(!tools.contains(&ToolId::AddressValidation));
    }

    #[test]
    fn from_name_round_trips() {
        for variant in [AgentVariant::Generic, AgentVariant::NewRegistration, AgentVariant::ReRegistration] {
            assert_eq!(AgentVariant::from_name(variant.name()), Some(variant));
        }
        assert_eq!(AgentVariant::from_name("bogus"), None);
    }

    #[test]
    fn resolve_substitutes_placeholder() {
        let (instructions, _) = resolve(AgentVariant::NewRegistration, Some("Ask for the parent's name."));
        assert!(instructions.contains("Ask for the parent's name."));
        assert!(!instructions.contains(STEP_PLACEHOLDER));
    }
}
