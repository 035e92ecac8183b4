use crate::models::BiasType;

/// Coaching sentence delivered to the participant for a bias type
pub fn nudge_text(bias_type: BiasType) -> &'static str {
    match bias_type {
        BiasType::Anchoring => {
            "Consider exploring other baselines before anchoring to the first figure. What does a bottom-up estimate suggest?"
        }
        BiasType::Confirmation => {
            "Consider inviting input from people who haven't been consulted yet. Broader sampling reduces confirmation bias."
        }
        BiasType::Groupthink => {
            "Silence isn't agreement. Try asking each person for one concern before locking this in."
        }
        BiasType::Availability => {
            "A vivid recent example may not be representative. What does the longer-run data show?"
        }
        BiasType::SunkCost => {
            "Consider whether the decision would change if no time had been invested yet."
        }
        BiasType::Authority => {
            "Would this proposal hold up on its merits if it came from someone else?"
        }
        BiasType::Recency => {
            "The latest numbers are one data point. How does this compare to the trend over several quarters?"
        }
        BiasType::Bandwagon => {
            "Others adopting this doesn't make it right for us. What is our own evidence?"
        }
        BiasType::StatusQuo => {
            "Try stating the cost of keeping things as they are with the same rigor as the cost of change."
        }
        BiasType::Framing => {
            "Try restating the option in the opposite frame. Does the preference still hold?"
        }
        BiasType::Overconfidence => {
            "What would have to be true for this to fail? Consider assigning an explicit confidence range."
        }
        BiasType::PlanningFallacy => {
            "Reference class check: similar past efforts usually overran their first estimate. Consider building in buffer."
        }
    }
}
