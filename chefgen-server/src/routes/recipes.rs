use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chefgen::basic_models::{Category, GenerateBody};
use chefgen::prompt::build_prompt;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::database::Database;
use crate::errors::{WebError, WebResult};
use crate::models::{NewRecipe, Recipe, RecipeFilter};

const MAX_PAGE_SIZE: u32 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/", get(list_recipes))
        .route("/:id", get(get_recipe).delete(delete_recipe))
        .route("/:id/favorite", put(toggle_favorite))
}

/// Ids are opaque to clients; anything that isn't one of ours simply doesn't exist.
fn parse_recipe_id(id: &str) -> WebResult<i64> {
    id.parse().map_err(|_| WebError::NotFound("Recipe not found"))
}

#[derive(Serialize, Debug)]
pub struct GenerateResponse {
    pub text: String,
    pub recipe: Option<Recipe>,
    /// Always false: every request reaches the model.
    pub cached: bool,
}

/// Generate a recipe, saving it for the caller if they are logged in.
async fn generate(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> WebResult<Json<ApiResponse<GenerateResponse>>> {
    let Json(body) = body?;
    let request = body.validate().map_err(WebError::Validation)?;
    let generated = state.generator.generate(&build_prompt(&request)).await?;
    tracing::info!(
        model = %generated.model,
        kind = %request.prompt_type(),
        "Generated recipe"
    );

    let recipe = match user {
        Some(user) => {
            let parsed = state.parser.parse(&request, &generated.text);
            let new_recipe = NewRecipe::from_generation(&request, parsed);
            // The caller still gets their text if saving fails
            match Recipe::create(&state.db, user.user_id, &new_recipe) {
                Ok(recipe) => Some(recipe),
                Err(e) => {
                    tracing::error!("Error saving recipe: {:#}", e);
                    None
                }
            }
        }
        None => None,
    };

    Ok(ApiResponse::data(GenerateResponse {
        text: generated.text,
        recipe,
        cached: false,
    }))
}

/// Query parameters arrive as loose strings from the client.
#[derive(Deserialize, Debug, Default)]
struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    category: Option<String>,
    favorite: Option<String>,
}

/// A positive integer, or the default for anything else.
fn positive_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

#[derive(Serialize, Debug, PartialEq)]
struct Pagination {
    current: u32,
    pages: i64,
    total: i64,
}

#[derive(Serialize, Debug)]
struct RecipePage {
    recipes: Vec<Recipe>,
    pagination: Pagination,
}

async fn list_recipes(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> WebResult<Json<ApiResponse<RecipePage>>> {
    let page = positive_or(query.page.as_deref(), 1);
    let limit = positive_or(query.limit.as_deref(), 10).min(MAX_PAGE_SIZE);
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => match name.parse::<Category>() {
            Ok(category) => Some(category),
            // No recipe can carry a category we don't know
            Err(_) => {
                return Ok(ApiResponse::data(RecipePage {
                    recipes: vec![],
                    pagination: Pagination {
                        current: page,
                        pages: 0,
                        total: 0,
                    },
                }))
            }
        },
    };
    let filter = RecipeFilter {
        page,
        limit,
        category,
        favorites_only: query.favorite.as_deref() == Some("true"),
    };
    let (recipes, total) = Recipe::list_for_user(&db, user.user_id, &filter)?;
    let limit = i64::from(limit);
    Ok(ApiResponse::data(RecipePage {
        recipes,
        pagination: Pagination {
            current: page,
            pages: (total + limit - 1) / limit,
            total,
        },
    }))
}

#[derive(Serialize, Debug)]
struct RecipeEnvelope {
    recipe: Recipe,
}

async fn get_recipe(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<ApiResponse<RecipeEnvelope>>> {
    let recipe = Recipe::get_for_user(&db, parse_recipe_id(&id)?, user.user_id)?
        .ok_or(WebError::NotFound("Recipe not found"))?;
    Ok(ApiResponse::data(RecipeEnvelope { recipe }))
}

async fn toggle_favorite(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<ApiResponse<RecipeEnvelope>>> {
    let recipe = Recipe::toggle_favorite(&db, parse_recipe_id(&id)?, user.user_id)?
        .ok_or(WebError::NotFound("Recipe not found"))?;
    let message = if recipe.is_favorite {
        "Recipe added to favorites"
    } else {
        "Recipe removed from favorites"
    };
    Ok(ApiResponse::with_message(message, RecipeEnvelope { recipe }))
}

async fn delete_recipe(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<ApiResponse<()>>> {
    if !Recipe::delete_for_user(&db, parse_recipe_id(&id)?, user.user_id)? {
        return Err(WebError::NotFound("Recipe not found"));
    }
    Ok(ApiResponse::message("Recipe deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_numbers_fall_back_to_defaults() {
        assert_eq!(positive_or(Some("3"), 1), 3);
        assert_eq!(positive_or(Some("0"), 1), 1);
        assert_eq!(positive_or(Some("-2"), 10), 10);
        assert_eq!(positive_or(Some("ten"), 10), 10);
        assert_eq!(positive_or(None, 10), 10);
    }

    #[test]
    fn recipe_ids_must_be_numbers() {
        assert_eq!(parse_recipe_id("17").unwrap(), 17);
        assert!(matches!(
            parse_recipe_id("64f0c0ffee"),
            Err(WebError::NotFound(_))
        ));
    }
}
