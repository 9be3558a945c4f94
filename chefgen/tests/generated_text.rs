use chefgen::basic_models::{Category, GenerateBody, GenerationRequest, PromptType};
use chefgen::classify::{HeuristicParser, RecipeParser};
use chefgen::prompt::build_prompt;

const PANCAKES: &str = r#"## **Fluffy Buttermilk Pancakes**

**Description**: Tall, tender pancakes with crisp golden edges. Perfect for a slow weekend morning.

**Prep Time**: 10 minutes
**Cook Time**: 15 minutes
**Total Time**: 25 minutes
**Servings**: 4 people
**Difficulty**: Beginner

Ingredients:
- 2 cups (250g) all-purpose flour
- 2 tablespoons granulated sugar
- 2 cups (480ml) buttermilk
• 2 large eggs
10. 3 tablespoons unsalted butter, melted

**Equipment Needed**:

Instructions:
1. Whisk the dry ingredients together in a large bowl.
2. In another bowl, whisk the buttermilk, eggs and melted butter.

**Chef's Tips**:
- Don't overmix; lumps are fine.
"#;

#[test]
fn direct_request_end_to_end() {
    let request: GenerationRequest = serde_json::from_str::<GenerateBody>(
        r#"{"type": "direct", "prompt": "buttermilk pancakes", "servings": "4"}"#,
    )
    .unwrap()
    .validate()
    .unwrap();

    let prompt = build_prompt(&request);
    assert!(prompt.contains("\"buttermilk pancakes\""));
    assert!(prompt.contains("serves exactly 4 people"));

    let parsed = HeuristicParser.parse(&request, PANCAKES);
    assert_eq!(parsed.title, "Fluffy Buttermilk Pancakes");
    assert_eq!(
        parsed.ingredients,
        vec![
            "2 cups (250g) all-purpose flour",
            "2 tablespoons granulated sugar",
            "2 cups (480ml) buttermilk",
            "2 large eggs",
            "3 tablespoons unsalted butter, melted",
        ]
    );
    assert_eq!(parsed.category, Category::Breakfast);
    assert_eq!(parsed.instructions, PANCAKES);
    assert_eq!(request.prompt_type(), PromptType::Direct);
}

#[test]
fn ingredients_request_end_to_end() {
    let request = serde_json::from_str::<GenerateBody>(
        r#"{"type": "ingredients", "ingredients": ["chickpeas", "spinach", "coconut milk"], "time": 30}"#,
    )
    .unwrap()
    .validate()
    .unwrap();

    let prompt = build_prompt(&request);
    assert!(prompt.contains("chickpeas, spinach, coconut milk"));
    assert!(prompt.contains("30 minutes or less"));

    let text = "**Chickpea & Spinach Coconut Curry**\n\nIngredients:\n- 1 can chickpeas\n";
    let parsed = HeuristicParser.parse(&request, text);
    assert_eq!(parsed.ingredients, vec!["chickpeas", "spinach", "coconut milk"]);
    assert_eq!(parsed.title, "Chickpea & Spinach Coconut Curry");
    assert_eq!(parsed.category, Category::Dinner);
    assert_eq!(request.original_prompt(), "chickpeas, spinach, coconut milk");
}
