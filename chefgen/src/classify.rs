//! Heuristics that pull a title, an ingredient list and a category out of
//! free-form generated recipe text.
//!
//! Nothing here can fail: every function falls back to a fixed value when the
//! text does not look the way the prompt asked for.

use lazy_static::lazy_static;
use regex::Regex;

use crate::basic_models::{Category, GenerationRequest, ParsedRecipe};

pub const FALLBACK_TITLE: &str = "Generated Recipe";
pub const FALLBACK_INGREDIENT: &str = "Mixed ingredients";
pub const MAX_TITLE_CHARS: usize = 200;

/// Turns raw generated text into a [`ParsedRecipe`].
///
/// The heuristic implementation is the only one today; a backend with
/// structured output can supply its own and skip the text scraping entirely.
pub trait RecipeParser: Send + Sync {
    fn parse(&self, request: &GenerationRequest, text: &str) -> ParsedRecipe;
}

/// Line-scanning and keyword parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicParser;

impl RecipeParser for HeuristicParser {
    fn parse(&self, request: &GenerationRequest, text: &str) -> ParsedRecipe {
        let title = extract_title(text);
        let ingredients = match request {
            // The caller's list is kept exactly as given.
            GenerationRequest::Ingredients { ingredients, .. } => ingredients.clone(),
            GenerationRequest::Direct { .. } => extract_ingredients(text),
        };
        let category = classify_category(&title, text);
        ParsedRecipe {
            title,
            ingredients,
            category,
            instructions: text.to_string(),
        }
    }
}

/// Short keywords that turn up inside unrelated words ("sub" in "sublime").
/// These only match as whole words.
const WHOLE_WORD_ONLY: &[&str] = &["tea", "sub", "dip", "pie", "nuts", "tart"];

/// One regex over `words`. Each keyword may carry a plural ending. Longer keywords also
/// match at the end of a compound ("shortcake", "cheeseburger").
fn keywords(words: &[&str]) -> Regex {
    let alternatives = words
        .iter()
        .map(|&w| {
            let start = if WHOLE_WORD_ONLY.contains(&w) { r"\b" } else { "" };
            format!("{start}{}(?:s|es)?", regex::escape(w))
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?:{alternatives})\b")).expect("keyword pattern")
}

lazy_static! {
    static ref HEADING_MARKER: Regex = Regex::new(r"^#+\s*").expect("heading pattern");
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:[-•]|\d+\.)\s*").expect("list pattern");

    static ref BEVERAGE_PATTERNS: Vec<Regex> = [
        r"\b(boba|bubble)\s+tea\b",
        r"\b(iced?|hot)\s+(tea|coffee|chocolate)\b",
        r"\b(green|black|herbal|chai)\s+tea\b",
        r"\b(smoothie|milkshake|frappuccino|latte|cappuccino|espresso|macchiato)\b",
        r"\b(juice|lemonade|punch|cocktail|mocktail|lassi)\b",
        r"\b(matcha|bubble|boba)\b.*\b(tea|drink|latte)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("beverage pattern"))
    .collect();
    static ref TEA: Regex = Regex::new(r"\btea\b").expect("tea pattern");
    static ref TEA_AS_SEASONING: Regex =
        Regex::new(r"\btea[- ](leaf|leaves|spice|rub|rubbed|smoked)\b").expect("tea pattern");
    static ref COFFEE: Regex = Regex::new(r"\bcoffee\b").expect("coffee pattern");
    static ref COFFEE_AS_SEASONING: Regex =
        Regex::new(r"\bcoffee[- ](bean|beans|rub|rubbed|crusted)\b").expect("coffee pattern");

    static ref DESSERT: Regex = keywords(&[
        "cake", "cakes", "cookie", "cookies", "pie", "ice cream", "gelato", "sorbet", "candy",
        "candies", "dessert", "desserts", "pudding", "mousse", "tart", "tartlet", "brownie", "brownies", "donut",
        "donuts", "pastry", "pastries", "custard", "tiramisu", "cheesecake", "fudge", "truffle", "truffles",
        "macaron", "macarons", "cupcake", "cupcakes", "sweet treat", "sundae", "parfait",
    ]);
    static ref DESSERT_PHRASES: Vec<Regex> = [
        r"\bchocolate\b.*\b(cake|dessert|sweet|treat)\b",
        r"\bsweet\b.*\b(treat|dessert|cake)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("dessert pattern"))
    .collect();

    static ref BREAKFAST: Regex = keywords(&[
        "pancake", "pancakes", "waffle", "waffles", "cereal", "oatmeal", "breakfast", "toast",
        "bagel", "bagels", "muffin", "muffins", "croissant", "croissants", "french toast",
        "eggs benedict", "scrambled eggs", "fried eggs", "omelet", "omelette", "breakfast burrito",
        "breakfast sandwich", "granola", "hash brown", "hash browns",
    ]);
    static ref BREAKFAST_CAKES: Regex =
        Regex::new(r"\b(?:pan|hot|griddle)cakes?\b").expect("breakfast cake pattern");
    static ref EGG_DISH: Regex =
        Regex::new(r"\beggs?\b.*\b(scrambled|fried|poached|benedict)\b").expect("egg pattern");

    static ref SNACK: Regex = keywords(&[
        "snack", "snacks", "chips", "dip", "crackers", "nuts", "popcorn", "pretzel", "pretzels",
        "trail mix", "appetizer", "appetizers", "finger food", "chicken wings", "buffalo wings",
        "nachos", "cheese balls", "deviled eggs", "stuffed", "bites",
    ]);

    static ref LUNCH: Regex = keywords(&[
        "sandwich", "sandwiches", "wrap", "wraps", "salad", "soup", "burger", "burgers", "pizza",
        "panini", "sub", "submarine", "club sandwich", "lunch", "quesadilla", "taco", "tacos", "burrito",
    ]);
}

/// The first meaningful line of the text, with markdown heading and bold markers removed.
pub fn extract_title(text: &str) -> String {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("Ingredients:")
            || trimmed.starts_with("Instructions:")
        {
            continue;
        }
        let title = HEADING_MARKER.replace(trimmed, "").replace("**", "");
        let title = title.trim();
        if title.is_empty() {
            continue;
        }
        return title.chars().take(MAX_TITLE_CHARS).collect();
    }
    FALLBACK_TITLE.to_string()
}

/// Bullet or numbered lines between the `ingredients:` marker and the
/// `instructions:` / `directions:` marker.
pub fn extract_ingredients(text: &str) -> Vec<String> {
    let mut ingredients = Vec::new();
    let mut in_section = false;
    for line in text.lines() {
        let trimmed = line.trim();
        // "**Ingredients**:" is a marker too
        let lower = trimmed.replace("**", "").to_lowercase();
        if lower.contains("ingredients:") {
            in_section = true;
            continue;
        }
        if lower.contains("instructions:") || lower.contains("directions:") {
            break;
        }
        if !in_section {
            continue;
        }
        if let Some(marker) = LIST_MARKER.find(trimmed) {
            let item = trimmed[marker.end()..].trim();
            if !item.is_empty() {
                ingredients.push(item.to_string());
            }
        }
    }
    if ingredients.is_empty() {
        vec![FALLBACK_INGREDIENT.to_string()]
    } else {
        ingredients
    }
}

/// Assign a meal category from the title.
///
/// Checks run in a fixed order and the first hit wins: beverage, dessert,
/// breakfast, snack, lunch, then dinner as the default. Beverages must stay
/// first: "chocolate milkshake" also matches the dessert keywords.
/// Only the title is consulted.
pub fn classify_category(title: &str, _body: &str) -> Category {
    let title = title.to_lowercase();

    if is_beverage(&title) {
        Category::Beverage
    } else if BREAKFAST_CAKES.is_match(&title) {
        // "pancakes" ends in a dessert keyword
        Category::Breakfast
    } else if DESSERT.is_match(&title) || DESSERT_PHRASES.iter().any(|p| p.is_match(&title)) {
        Category::Dessert
    } else if BREAKFAST.is_match(&title) || EGG_DISH.is_match(&title) {
        Category::Breakfast
    } else if SNACK.is_match(&title) {
        Category::Snack
    } else if LUNCH.is_match(&title) {
        Category::Lunch
    } else {
        Category::Dinner
    }
}

fn is_beverage(title: &str) -> bool {
    BEVERAGE_PATTERNS.iter().any(|p| p.is_match(title))
        || title.contains("drink")
        || title.contains("beverage")
        || (TEA.is_match(title) && !TEA_AS_SEASONING.is_match(title))
        || (COFFEE.is_match(title) && !COFFEE_AS_SEASONING.is_match(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_bold_markers() {
        assert_eq!(
            extract_title("**Spicy Ramen**\nIngredients:\n- noodles"),
            "Spicy Ramen"
        );
    }

    #[test]
    fn title_strips_heading_markers() {
        assert_eq!(extract_title("\n\n## Lemon **Risotto**\n"), "Lemon Risotto");
    }

    #[test]
    fn title_skips_section_lines() {
        assert_eq!(
            extract_title("Ingredients: flour\nInstructions: mix\nRustic Bread"),
            "Rustic Bread"
        );
    }

    #[test]
    fn title_falls_back_when_nothing_qualifies() {
        assert_eq!(extract_title(""), FALLBACK_TITLE);
        assert_eq!(
            extract_title("   \nIngredients: eggs\n\t\nInstructions: whisk\n"),
            FALLBACK_TITLE
        );
    }

    #[test]
    fn bare_markers_are_not_titles() {
        assert_eq!(extract_title("**\nReal Title\n"), "Real Title");
        assert_eq!(extract_title("#\nReal Title\n"), "Real Title");
        assert_eq!(extract_title("## **\n"), FALLBACK_TITLE);
    }

    #[test]
    fn title_is_truncated_by_characters() {
        let long = "é".repeat(300);
        let title = extract_title(&long);
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn ingredients_between_markers() {
        let text = "Garlic Noodles\n\nIngredients:\n- 200g noodles\n• 4 cloves garlic\n3. 2 tbsp butter\nnot a list line\n\nInstructions:\n1. Boil the noodles\n";
        assert_eq!(
            extract_ingredients(text),
            vec!["200g noodles", "4 cloves garlic", "2 tbsp butter"]
        );
    }

    #[test]
    fn multi_digit_numbers_are_stripped_whole() {
        let text = "Ingredients:\n12. pinch of salt\nDirections:\n";
        assert_eq!(extract_ingredients(text), vec!["pinch of salt"]);
    }

    #[test]
    fn bold_section_headers_count_as_markers() {
        let text = "**Ingredients**:\n- 1 cup rice\n**Instructions**:\n1. Rinse";
        assert_eq!(extract_ingredients(text), vec!["1 cup rice"]);
    }

    #[test]
    fn ingredients_fall_back_without_marker() {
        assert_eq!(
            extract_ingredients("Toast\n- bread\n- butter"),
            vec![FALLBACK_INGREDIENT]
        );
    }

    #[test]
    fn instructions_before_ingredients_stop_the_scan() {
        let text = "Instructions:\n1. mix\nIngredients:\n- flour";
        assert_eq!(extract_ingredients(text), vec![FALLBACK_INGREDIENT]);
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        let text = "INGREDIENTS:\n- rice\nINSTRUCTIONS:\n- cook";
        assert_eq!(extract_ingredients(text), vec!["rice"]);
    }

    #[test]
    fn beverage_beats_dessert() {
        assert_eq!(classify_category("Iced Matcha Latte", ""), Category::Beverage);
        assert_eq!(
            classify_category("Chocolate Milkshake Sundae", ""),
            Category::Beverage
        );
        assert_eq!(classify_category("Thai Iced Tea", ""), Category::Beverage);
    }

    #[test]
    fn cake_is_dessert() {
        assert_eq!(classify_category("Chocolate Lava Cake", ""), Category::Dessert);
    }

    #[test]
    fn plurals_and_compounds_still_match() {
        for title in [
            "Mini Apple Pies",
            "Lemon Tarts",
            "Mini Cheesecakes",
            "Strawberry Shortcake",
            "Raspberry Tartlets",
        ] {
            assert_eq!(classify_category(title, ""), Category::Dessert, "{title}");
        }
        assert_eq!(classify_category("Mini Pizzas", ""), Category::Lunch);
        assert_eq!(classify_category("Double Cheeseburgers", ""), Category::Lunch);
        assert_eq!(classify_category("Fish Tacos", ""), Category::Lunch);
    }

    #[test]
    fn pancakes_are_breakfast_not_cake() {
        assert_eq!(classify_category("Chocolate Chip Pancakes", ""), Category::Breakfast);
        assert_eq!(classify_category("Ricotta Hotcakes", ""), Category::Breakfast);
    }

    #[test]
    fn short_keywords_need_a_word_boundary() {
        assert_eq!(classify_category("Potato Pierogi", ""), Category::Dinner);
        assert_eq!(classify_category("Beef Tartare", ""), Category::Dinner);
        assert_eq!(classify_category("Coconut Curry", ""), Category::Dinner);
    }

    #[test]
    fn tea_inside_other_words_is_not_a_drink() {
        assert_eq!(classify_category("Garlic Butter Steak", ""), Category::Dinner);
        assert_eq!(
            classify_category("Tea-Smoked Duck Breast", ""),
            Category::Dinner
        );
        assert_eq!(
            classify_category("Coffee-Rubbed Brisket", ""),
            Category::Dinner
        );
    }

    #[test]
    fn remaining_categories_in_priority_order() {
        assert_eq!(classify_category("Fluffy Buttermilk Pancakes", ""), Category::Breakfast);
        assert_eq!(classify_category("Eggs, Poached", ""), Category::Breakfast);
        assert_eq!(classify_category("Stuffed Mushrooms", ""), Category::Snack);
        assert_eq!(classify_category("Chicken Caesar Salad", ""), Category::Lunch);
        assert_eq!(classify_category("Braised Short Ribs", ""), Category::Dinner);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(classify_category("Toasted Sesame Noodles", ""), Category::Dinner);
        assert_eq!(classify_category("Sublime Beef Stew", ""), Category::Dinner);
    }

    #[test]
    fn body_does_not_change_the_category() {
        assert_eq!(
            classify_category("Roast Chicken", "Serve with a glass of juice and a slice of cake"),
            Category::Dinner
        );
    }

    #[test]
    fn heuristic_parser_keeps_requested_ingredients() {
        let request = GenerationRequest::Ingredients {
            ingredients: vec!["  tofu".into(), "Bok Choy".into()],
            servings: 2,
            time_limit_minutes: None,
        };
        let text = "Tofu Stir Fry\nIngredients:\n- firm tofu\n- oil\nInstructions:\n1. fry";
        let parsed = HeuristicParser.parse(&request, text);
        assert_eq!(parsed.ingredients, vec!["  tofu", "Bok Choy"]);
        assert_eq!(parsed.title, "Tofu Stir Fry");
        assert_eq!(parsed.category, Category::Dinner);
        assert_eq!(parsed.instructions, text);
    }

    #[test]
    fn heuristic_parser_extracts_for_direct_requests() {
        let request = GenerationRequest::Direct {
            dish_name: "Hummus".into(),
            servings: 4,
        };
        let text = "# Creamy Hummus Dip\nIngredients:\n- chickpeas\n- tahini\nInstructions:\n1. blend";
        let parsed = HeuristicParser.parse(&request, text);
        assert_eq!(parsed.ingredients, vec!["chickpeas", "tahini"]);
        assert_eq!(parsed.category, Category::Snack);
    }
}
