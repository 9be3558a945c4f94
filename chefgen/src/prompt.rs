//! Builds the instruction text sent to the generation backend.
//!
//! Both templates ask for bold `**Section**:` headers so the classifier in
//! [`crate::classify`] has something to latch on to.

use crate::basic_models::GenerationRequest;

const DIRECT_TEMPLATE: &str = include_str!("../prompts/direct.md");
const INGREDIENTS_TEMPLATE: &str = include_str!("../prompts/ingredients.md");

/// Build the prompt for a request. Pure and deterministic.
pub fn build_prompt(request: &GenerationRequest) -> String {
    match request {
        GenerationRequest::Direct {
            dish_name,
            servings,
        } => DIRECT_TEMPLATE
            .replace("{servings}", &servings.to_string())
            // User text goes in last so it is never scanned for placeholders.
            .replace("{dish}", dish_name),
        GenerationRequest::Ingredients {
            ingredients,
            servings,
            time_limit_minutes,
        } => {
            let notes = TimeNotes::new(*time_limit_minutes);
            INGREDIENTS_TEMPLATE
                .replace("{time_instruction}", &notes.instruction)
                .replace("{prep_note}", &notes.within_total)
                .replace("{cook_note}", &notes.within_total)
                .replace("{total_note}", &notes.total)
                .replace("{equipment_note}", &notes.equipment)
                .replace("{technique_note}", &notes.technique)
                .replace("{timing_note}", &notes.timing)
                .replace("{clarity_note}", &notes.clarity)
                .replace("{closing_timeframe}", &notes.closing_timeframe)
                .replace("{closing_efficiency}", &notes.closing_efficiency)
                .replace("{servings}", &servings.to_string())
                .replace("{ingredients}", &ingredients.join(", "))
        }
    }
}

/// The clauses that carry a time limit through every timing-related line of the template.
/// All empty when there is no limit.
#[derive(Default)]
struct TimeNotes {
    instruction: String,
    within_total: String,
    total: String,
    equipment: String,
    technique: String,
    timing: String,
    clarity: String,
    closing_timeframe: String,
    closing_efficiency: String,
}

impl TimeNotes {
    fn new(limit: Option<u32>) -> Self {
        let Some(minutes) = limit else {
            return Self::default();
        };
        Self {
            instruction: format!(
                " The total cooking time (prep + cook time) should be approximately {minutes} minutes or less."
            ),
            within_total: format!(" (keep within the {minutes}-minute total time constraint)"),
            total: format!(" (should not exceed {minutes} minutes)"),
            equipment: " (prioritize time-efficient equipment if applicable)".into(),
            technique: format!(" that fit within the {minutes}-minute timeframe"),
            timing: " (ensure total time stays within limit)".into(),
            clarity: " while maintaining efficiency".into(),
            closing_timeframe: format!(" within the {minutes}-minute timeframe"),
            closing_efficiency: " that can be prepared efficiently".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredients_request(limit: Option<u32>) -> GenerationRequest {
        GenerationRequest::Ingredients {
            ingredients: vec!["chickpeas".into(), "spinach".into(), "lemon".into()],
            servings: 3,
            time_limit_minutes: limit,
        }
    }

    #[test]
    fn direct_prompt_embeds_dish_and_servings() {
        let prompt = build_prompt(&GenerationRequest::Direct {
            dish_name: "Beef Wellington".into(),
            servings: 6,
        });
        assert!(prompt.contains("recipe for \"Beef Wellington\" that serves exactly 6 people"));
        assert!(prompt.contains("**Servings**: 6 people"));
        assert!(prompt.contains("**Ingredients**:"));
        assert!(prompt.contains("**Instructions**:"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn ingredients_prompt_joins_with_commas() {
        let prompt = build_prompt(&ingredients_request(None));
        assert!(prompt.contains("primary ingredients: chickpeas, spinach, lemon that serves exactly 3 people."));
        assert!(prompt.contains("Start with the provided ingredients: chickpeas, spinach, lemon"));
        assert!(!prompt.contains("minute"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn time_limit_reaches_every_timing_clause() {
        let prompt = build_prompt(&ingredients_request(Some(25)));
        assert!(prompt.contains("approximately 25 minutes or less."));
        assert_eq!(
            prompt
                .matches("(keep within the 25-minute total time constraint)")
                .count(),
            2
        );
        assert!(prompt.contains("**Total Time**: Combined time (should not exceed 25 minutes)"));
        assert!(prompt.contains("cooking methods that fit within the 25-minute timeframe"));
        assert!(prompt.contains("(ensure total time stays within limit)"));
        assert!(prompt.contains("for 3 people within the 25-minute timeframe."));
    }

    #[test]
    fn prompt_is_deterministic() {
        let request = ingredients_request(Some(40));
        assert_eq!(build_prompt(&request), build_prompt(&request));
    }

    #[test]
    fn placeholders_in_user_text_are_left_alone() {
        let prompt = build_prompt(&GenerationRequest::Direct {
            dish_name: "{servings} layer dip".into(),
            servings: 2,
        });
        assert!(prompt.contains("\"{servings} layer dip\""));
    }
}
