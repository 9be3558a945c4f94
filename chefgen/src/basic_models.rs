use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

pub const DEFAULT_SERVINGS: u32 = 4;
pub const MAX_SERVINGS: u32 = 20;

/// Meal category assigned to every generated recipe.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum Category {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Snack,
    Dessert,
    Beverage,
}

/// How the recipe was requested. Stored alongside the recipe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptType {
    Direct,
    Ingredients,
}

/// A validated request to generate a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Generate a recipe for a named dish.
    Direct { dish_name: String, servings: u32 },
    /// Invent a recipe around a list of ingredients.
    Ingredients {
        ingredients: Vec<String>,
        servings: u32,
        time_limit_minutes: Option<u32>,
    },
}

impl GenerationRequest {
    pub fn prompt_type(&self) -> PromptType {
        match self {
            GenerationRequest::Direct { .. } => PromptType::Direct,
            GenerationRequest::Ingredients { .. } => PromptType::Ingredients,
        }
    }

    pub fn servings(&self) -> u32 {
        match self {
            GenerationRequest::Direct { servings, .. }
            | GenerationRequest::Ingredients { servings, .. } => *servings,
        }
    }

    /// What the user actually typed: the dish name, or the ingredients joined with commas.
    pub fn original_prompt(&self) -> String {
        match self {
            GenerationRequest::Direct { dish_name, .. } => dish_name.clone(),
            GenerationRequest::Ingredients { ingredients, .. } => ingredients.join(", "),
        }
    }
}

/// Structured fields pulled out of a generated recipe text.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub category: Category,
    /// The full generated text, verbatim.
    pub instructions: String,
}

impl std::fmt::Debug for ParsedRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedRecipe")
            .field("title", &self.title)
            .field("ingredients", &self.ingredients)
            .field("category", &self.category)
            .field("instructions", &self.instructions.len())
            .finish()
    }
}

/// One rejected input field, reported back to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The generation request body as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub servings: Option<i64>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub time: Option<i64>,
}

impl GenerateBody {
    /// Check the body and turn it into a [`GenerationRequest`], reporting every bad field at once.
    pub fn validate(self) -> Result<GenerationRequest, Vec<FieldError>> {
        let mut errors = Vec::new();
        match self.kind.as_deref() {
            Some("direct") => {
                let dish_name = self.prompt.unwrap_or_default();
                if dish_name.trim().is_empty() {
                    errors.push(FieldError::new(
                        "prompt",
                        "Prompt is required for direct recipe generation",
                    ));
                }
                let servings = match self.servings {
                    Some(n) if (1..=MAX_SERVINGS as i64).contains(&n) => n as u32,
                    _ => {
                        errors.push(FieldError::new(
                            "servings",
                            "Servings must be a number between 1 and 20 for direct recipes",
                        ));
                        0
                    }
                };
                if errors.is_empty() {
                    Ok(GenerationRequest::Direct {
                        dish_name,
                        servings,
                    })
                } else {
                    Err(errors)
                }
            }
            Some("ingredients") => {
                let ingredients = self.ingredients.unwrap_or_default();
                if ingredients.is_empty() {
                    errors.push(FieldError::new(
                        "ingredients",
                        "At least one ingredient is required",
                    ));
                }
                let servings = match self.servings {
                    None => DEFAULT_SERVINGS,
                    Some(n) if (1..=MAX_SERVINGS as i64).contains(&n) => n as u32,
                    Some(_) => {
                        errors.push(FieldError::new(
                            "servings",
                            "Servings must be a number between 1 and 20",
                        ));
                        DEFAULT_SERVINGS
                    }
                };
                // Zero means "any time", the same as leaving it out.
                let time_limit_minutes = match self.time {
                    None | Some(0) => None,
                    Some(n) if n > 0 && n <= u32::MAX as i64 => Some(n as u32),
                    Some(_) => {
                        errors.push(FieldError::new(
                            "time",
                            "Time limit must be a positive number of minutes",
                        ));
                        None
                    }
                };
                if errors.is_empty() {
                    Ok(GenerationRequest::Ingredients {
                        ingredients,
                        servings,
                        time_limit_minutes,
                    })
                } else {
                    Err(errors)
                }
            }
            _ => Err(vec![FieldError::new(
                "type",
                "Type must be either \"direct\" or \"ingredients\"",
            )]),
        }
    }
}

/// Accept `4`, `"4"`, `""` or `null`. Form selects post numbers as strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
        Some(IntOrString::Float(f)) => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {f}"
        ))),
        Some(IntOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
    }
}
