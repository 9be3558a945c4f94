use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, get},
    Json, Router,
};
use chefgen::basic_models::FieldError;
use serde::{Deserialize, Serialize};

use super::accounts::{UserEnvelope, MAX_CUISINE_CHARS};
use super::{ApiResponse, AppState};
use crate::auth::{AuthKeys, AuthUser};
use crate::database::Database;
use crate::errors::{WebError, WebResult};
use crate::models::{PreferencesUpdate, RecentRecipe, Recipe, User};

const RECENT_RECIPES: u32 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(user_stats))
        .route("/recipes/count", get(recipe_count))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/account", delete(delete_account))
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
}

/// Milestones reached so far, recipe milestones first.
pub fn achievements(recipe_count: i64, favorite_count: i64) -> Vec<Achievement> {
    const RECIPE_MILESTONES: [(i64, &str, &str); 4] = [
        (1, "First Recipe", "Generated your first recipe!"),
        (10, "Chef in Training", "Generated 10 recipes!"),
        (50, "Master Chef", "Generated 50 recipes!"),
        (100, "Recipe Master", "Generated 100 recipes!"),
    ];
    const FAVORITE_MILESTONES: [(i64, &str, &str); 2] = [
        (5, "Taste Maker", "Favorited 5 recipes!"),
        (20, "Connoisseur", "Favorited 20 recipes!"),
    ];
    let mut reached = vec![];
    for (milestones, count) in [
        (&RECIPE_MILESTONES[..], recipe_count),
        (&FAVORITE_MILESTONES[..], favorite_count),
    ] {
        for &(at, name, description) in milestones {
            if count >= at {
                reached.push(Achievement { name, description });
            }
        }
    }
    reached
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UserStats {
    recipes_generated: i64,
    favorite_recipes: i64,
    user_rank: i64,
    total_users: i64,
    join_date: String,
    recent_recipes: Vec<RecentRecipe>,
    achievements: Vec<Achievement>,
}

async fn user_stats(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
) -> WebResult<Json<ApiResponse<UserStats>>> {
    let recipe_count = Recipe::count_for_user(&db, user.user_id)?;
    let favorite_count = Recipe::count_favorites_for_user(&db, user.user_id)?;
    Ok(ApiResponse::data(UserStats {
        recipes_generated: recipe_count,
        favorite_recipes: favorite_count,
        user_rank: User::rank(&db, user.recipes_generated)?,
        total_users: User::count_all(&db)?,
        join_date: user.created_at,
        recent_recipes: Recipe::recent_for_user(&db, user.user_id, RECENT_RECIPES)?,
        achievements: achievements(recipe_count, favorite_count),
    }))
}

#[derive(Serialize, Debug)]
struct RecipeCount {
    count: i64,
}

async fn recipe_count(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
) -> WebResult<Json<ApiResponse<RecipeCount>>> {
    Ok(ApiResponse::data(RecipeCount {
        count: Recipe::count_for_user(&db, user.user_id)?,
    }))
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Preferences {
    favorites_cuisine: String,
    dietary_restrictions: String,
    skill_level: String,
    preferred_cooking_time: String,
}

impl From<&User> for Preferences {
    fn from(user: &User) -> Self {
        let or = |value: &Option<String>, default: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            favorites_cuisine: user.favorites_cuisine.clone(),
            dietary_restrictions: or(&user.dietary_restrictions, "None"),
            skill_level: or(&user.skill_level, "Intermediate"),
            preferred_cooking_time: or(&user.preferred_cooking_time, "30-45 minutes"),
        }
    }
}

async fn get_preferences(AuthUser(user): AuthUser) -> Json<ApiResponse<Preferences>> {
    ApiResponse::data(Preferences::from(&user))
}

async fn update_preferences(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    body: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> WebResult<Json<ApiResponse<UserEnvelope>>> {
    let Json(update) = body?;
    if update
        .favorites_cuisine
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_CUISINE_CHARS)
    {
        return Err(WebError::Validation(vec![FieldError::new(
            "favoritesCuisine",
            "Favorite cuisines cannot exceed 200 characters",
        )]));
    }
    let user = User::update_preferences(&db, user.user_id, &update)?
        .ok_or(WebError::NotFound("User not found"))?;
    Ok(ApiResponse::with_message(
        "Preferences updated successfully",
        UserEnvelope { user },
    ))
}

#[derive(Deserialize, Debug, Default)]
struct DeleteAccountBody {
    #[serde(default)]
    password: String,
}

/// Delete the account and all of its recipes, after checking the password again.
async fn delete_account(
    State(db): State<Database>,
    State(keys): State<AuthKeys>,
    AuthUser(user): AuthUser,
    body: Result<Json<DeleteAccountBody>, JsonRejection>,
) -> WebResult<Json<ApiResponse<()>>> {
    let Json(body) = body?;
    if !keys.verify_password(&body.password, &user.password_hash) {
        return Err(WebError::Auth("Invalid password".into()));
    }
    if !User::delete_with_recipes(&db, user.user_id)? {
        return Err(WebError::NotFound("User not found"));
    }
    Ok(ApiResponse::message("Account deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(achievements: &[Achievement]) -> Vec<&'static str> {
        achievements.iter().map(|a| a.name).collect()
    }

    #[test]
    fn no_achievements_for_new_users() {
        assert!(achievements(0, 0).is_empty());
    }

    #[test]
    fn achievements_accumulate() {
        assert_eq!(
            names(&achievements(12, 5)),
            ["First Recipe", "Chef in Training", "Taste Maker"]
        );
        assert_eq!(
            names(&achievements(100, 20)),
            [
                "First Recipe",
                "Chef in Training",
                "Master Chef",
                "Recipe Master",
                "Taste Maker",
                "Connoisseur"
            ]
        );
    }
}
