use serde::Serialize;

/// A persona offered in the call demo. Agents are fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub avatar: String,
}

impl Agent {
    pub fn new(name: &str, subtitle: &str, avatar: &str) -> Self {
        Self {
            id: name.to_lowercase(),
            name: name.to_string(),
            subtitle: subtitle.to_string(),
            avatar: avatar.to_string(),
        }
    }
}

pub fn default_roster() -> Vec<Agent> {
    vec![
        Agent::new(
            "Lisa",
            "Human-like conversational AI",
            "/Flux_Schnell_A_cuttingedge_AI_voice_agent_for_the_call_center__0.jpg",
        ),
        Agent::new(
            "Rohan",
            "24/7 Support Specialist",
            "/Flux_Schnell_A_highly_detailed_photorealistic_portrait_of_a_mo_2.jpg",
        ),
        Agent::new(
            "Mei",
            "Language & Culture Expert",
            "/AlbedoBase_XL_A_cuttingedge_AI_voice_agent_for_the_call_center_3.jpg",
        ),
    ]
}
