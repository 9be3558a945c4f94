use std::fmt::Debug;

use crate::database::{Database, FromRow};
use anyhow::{anyhow, Result};
use chefgen::basic_models::{Category, GenerationRequest, ParsedRecipe, PromptType};
use rusqlite::{named_params, params};
use serde::{Deserialize, Serialize};

/// RFC 3339 in UTC with millisecond precision. Fixed width, so it sorts as text.
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a text column with `FromStr`, reporting failures as a conversion error on that column.
fn parse_column<T>(row: &rusqlite::Row, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(column)?;
    let index = row.as_ref().column_index(column)?;
    text.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "id")]
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub favorites_cuisine: String,
    pub profile_picture: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub skill_level: Option<String>,
    pub preferred_cooking_time: Option<String>,
    pub recipes_generated: i64,
    pub favorite_recipes: i64,
    pub is_active: bool,
    pub last_login: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl FromRow for User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            bio: row.get("bio")?,
            favorites_cuisine: row.get("favorites_cuisine")?,
            profile_picture: row.get("profile_picture")?,
            dietary_restrictions: row.get("dietary_restrictions")?,
            skill_level: row.get("skill_level")?,
            preferred_cooking_time: row.get("preferred_cooking_time")?,
            recipes_generated: row.get("recipes_generated")?,
            favorite_recipes: row.get("favorite_recipes")?,
            is_active: row.get("is_active")?,
            last_login: row.get("last_login")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Fields a user may change on their own profile. `None` leaves the column alone.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub favorites_cuisine: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub favorites_cuisine: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub skill_level: Option<String>,
    pub preferred_cooking_time: Option<String>,
}

/// Totals over every active account, shown on the landing page.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
    pub total_users: i64,
    pub total_recipes: i64,
    pub avg_recipes_per_user: f64,
    pub total_recipes_generated: i64,
}

impl User {
    /// Create an account. The email must already be normalized.
    pub fn create(db: &Database, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let conn = db.conn()?;
        let now = current_timestamp();
        conn.execute(
            "INSERT INTO User (name, email, password_hash, last_login, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4, ?4)",
            params![name, email, password_hash, now],
        )?;
        let user_id = conn.last_insert_rowid();
        Self::get_by_id(db, user_id)?.ok_or_else(|| anyhow!("User {user_id} vanished after insert"))
    }

    pub fn get_by_id(db: &Database, user_id: i64) -> Result<Option<User>> {
        Ok(db
            .collect_rows("SELECT * FROM User WHERE user_id = ?", params![user_id])?
            .pop())
    }

    pub fn find_by_email(db: &Database, email: &str) -> Result<Option<User>> {
        Ok(db
            .collect_rows("SELECT * FROM User WHERE email = ?", params![email])?
            .pop())
    }

    pub fn update_profile(db: &Database, user_id: i64, update: &ProfileUpdate) -> Result<Option<User>> {
        let conn = db.conn()?;
        conn.execute(
            "UPDATE User SET
                name = COALESCE(:name, name),
                bio = COALESCE(:bio, bio),
                favorites_cuisine = COALESCE(:favorites_cuisine, favorites_cuisine),
                updated_at = :now
            WHERE user_id = :user_id",
            named_params! {
                ":name": update.name,
                ":bio": update.bio,
                ":favorites_cuisine": update.favorites_cuisine,
                ":now": current_timestamp(),
                ":user_id": user_id,
            },
        )?;
        Self::get_by_id(db, user_id)
    }

    /// Replace the profile picture, or clear it with `None`.
    pub fn set_profile_picture(
        db: &Database,
        user_id: i64,
        picture: Option<&str>,
    ) -> Result<Option<User>> {
        let conn = db.conn()?;
        conn.execute(
            "UPDATE User SET profile_picture = ?, updated_at = ? WHERE user_id = ?",
            params![picture, current_timestamp(), user_id],
        )?;
        Self::get_by_id(db, user_id)
    }

    pub fn update_preferences(
        db: &Database,
        user_id: i64,
        update: &PreferencesUpdate,
    ) -> Result<Option<User>> {
        let conn = db.conn()?;
        conn.execute(
            "UPDATE User SET
                favorites_cuisine = COALESCE(:favorites_cuisine, favorites_cuisine),
                dietary_restrictions = COALESCE(:dietary_restrictions, dietary_restrictions),
                skill_level = COALESCE(:skill_level, skill_level),
                preferred_cooking_time = COALESCE(:preferred_cooking_time, preferred_cooking_time),
                updated_at = :now
            WHERE user_id = :user_id",
            named_params! {
                ":favorites_cuisine": update.favorites_cuisine,
                ":dietary_restrictions": update.dietary_restrictions,
                ":skill_level": update.skill_level,
                ":preferred_cooking_time": update.preferred_cooking_time,
                ":now": current_timestamp(),
                ":user_id": user_id,
            },
        )?;
        Self::get_by_id(db, user_id)
    }

    pub fn touch_last_login(db: &Database, user_id: i64) -> Result<()> {
        let conn = db.conn()?;
        conn.execute(
            "UPDATE User SET last_login = ? WHERE user_id = ?",
            params![current_timestamp(), user_id],
        )?;
        Ok(())
    }

    /// Reset both counters from the recipes that actually exist.
    pub fn recompute_counters(db: &Database, user_id: i64) -> Result<()> {
        let conn = db.conn()?;
        Self::recompute_counters_on(&conn, user_id)
    }

    /// Same as [`User::recompute_counters`], on a connection that may be inside a transaction.
    fn recompute_counters_on(conn: &rusqlite::Connection, user_id: i64) -> Result<()> {
        conn.execute(
            "UPDATE User SET
                recipes_generated = (SELECT COUNT(*) FROM Recipe WHERE user_id = ?1),
                favorite_recipes = (SELECT COUNT(*) FROM Recipe WHERE user_id = ?1 AND is_favorite = 1)
            WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    /// Delete the account and every recipe it owns, all or nothing.
    ///
    /// Returns false if there was no such user.
    pub fn delete_with_recipes(db: &Database, user_id: i64) -> Result<bool> {
        let mut conn = db.conn()?;
        let tx = conn.transaction()?;
        let recipes = tx.execute("DELETE FROM Recipe WHERE user_id = ?", params![user_id])?;
        let users = tx.execute("DELETE FROM User WHERE user_id = ?", params![user_id])?;
        tx.commit()?;
        tracing::info!(user_id, recipes, "Deleted account");
        Ok(users > 0)
    }

    /// 1 for the most prolific user. Ties share a rank.
    pub fn rank(db: &Database, recipes_generated: i64) -> Result<i64> {
        let ahead = db.count(
            "SELECT COUNT(*) FROM User WHERE recipes_generated > ?",
            params![recipes_generated],
        )?;
        Ok(ahead + 1)
    }

    pub fn count_all(db: &Database) -> Result<i64> {
        db.count("SELECT COUNT(*) FROM User", params![])
    }

    pub fn app_stats(db: &Database) -> Result<AppStats> {
        let conn = db.conn()?;
        let (total_users, avg_recipes_per_user, total_recipes_generated) = conn.query_row(
            "SELECT COUNT(*), COALESCE(AVG(recipes_generated), 0.0), COALESCE(SUM(recipes_generated), 0)
            FROM User WHERE is_active = 1",
            params![],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(AppStats {
            total_users,
            total_recipes: Recipe::count_all(db)?,
            avg_recipes_per_user,
            total_recipes_generated,
        })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "id")]
    pub recipe_id: i64,
    pub user_id: i64,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub category: Category,
    pub servings: u32,
    pub is_favorite: bool,
    pub prompt_type: PromptType,
    pub original_prompt: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Recipe {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let ingredients: String = row.get("ingredients")?;
        let ingredients = serde_json::from_str(&ingredients).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            ingredients,
            instructions: row.get("instructions")?,
            category: parse_column(row, "category")?,
            servings: row.get("servings")?,
            is_favorite: row.get("is_favorite")?,
            prompt_type: parse_column(row, "prompt_type")?,
            original_prompt: row.get("original_prompt")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// A recipe ready to be saved, before it has an id or an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub category: Category,
    pub servings: u32,
    pub prompt_type: PromptType,
    pub original_prompt: String,
}

impl NewRecipe {
    pub fn from_generation(request: &GenerationRequest, parsed: ParsedRecipe) -> Self {
        Self {
            title: parsed.title,
            ingredients: parsed.ingredients,
            instructions: parsed.instructions,
            category: parsed.category,
            servings: request.servings(),
            prompt_type: request.prompt_type(),
            original_prompt: request.original_prompt(),
        }
    }
}

/// Which of a user's recipes to list. `page` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFilter {
    pub page: u32,
    pub limit: u32,
    pub category: Option<Category>,
    pub favorites_only: bool,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category: None,
            favorites_only: false,
        }
    }
}

/// Just enough of a recipe for the "recent activity" list.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecipe {
    #[serde(rename = "id")]
    pub recipe_id: i64,
    pub title: String,
    pub category: Category,
    pub created_at: String,
}

impl FromRow for RecentRecipe {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            title: row.get("title")?,
            category: parse_column(row, "category")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Recipe {
    /// Save a recipe for `user_id` and refresh that user's counters, all or nothing.
    pub fn create(db: &Database, user_id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        let recipe_id = {
            let mut conn = db.conn()?;
            let tx = conn.transaction()?;
            let category: &'static str = recipe.category.into();
            let prompt_type: &'static str = recipe.prompt_type.into();
            tx.execute(
                "INSERT INTO Recipe (user_id, title, ingredients, instructions, category, servings,
                    prompt_type, original_prompt, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    user_id,
                    recipe.title,
                    serde_json::to_string(&recipe.ingredients)?,
                    recipe.instructions,
                    category,
                    recipe.servings,
                    prompt_type,
                    recipe.original_prompt,
                    current_timestamp()
                ],
            )?;
            let recipe_id = tx.last_insert_rowid();
            User::recompute_counters_on(&tx, user_id)?;
            tx.commit()?;
            recipe_id
        };
        Self::get_for_user(db, recipe_id, user_id)?
            .ok_or_else(|| anyhow!("Recipe {recipe_id} vanished after insert"))
    }

    /// One page of a user's recipes, newest first, plus how many match the filter in total.
    pub fn list_for_user(
        db: &Database,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<(Vec<Recipe>, i64)> {
        let category: Option<&'static str> = filter.category.map(Into::into);
        let offset = i64::from(filter.page.saturating_sub(1)) * i64::from(filter.limit);
        let recipes = db.collect_rows(
            "SELECT * FROM Recipe
            WHERE user_id = :user_id
                AND (:category IS NULL OR category = :category)
                AND (:favorites_only = 0 OR is_favorite = 1)
            ORDER BY created_at DESC, recipe_id DESC
            LIMIT :limit OFFSET :offset",
            named_params! {
                ":user_id": user_id,
                ":category": category,
                ":favorites_only": filter.favorites_only,
                ":limit": filter.limit,
                ":offset": offset,
            },
        )?;
        let total = db.count(
            "SELECT COUNT(*) FROM Recipe
            WHERE user_id = :user_id
                AND (:category IS NULL OR category = :category)
                AND (:favorites_only = 0 OR is_favorite = 1)",
            named_params! {
                ":user_id": user_id,
                ":category": category,
                ":favorites_only": filter.favorites_only,
            },
        )?;
        Ok((recipes, total))
    }

    /// A recipe, but only if `user_id` owns it.
    pub fn get_for_user(db: &Database, recipe_id: i64, user_id: i64) -> Result<Option<Recipe>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM Recipe WHERE recipe_id = ? AND user_id = ?",
                params![recipe_id, user_id],
            )?
            .pop())
    }

    /// Flip the favorite flag in place and return the updated recipe.
    pub fn toggle_favorite(db: &Database, recipe_id: i64, user_id: i64) -> Result<Option<Recipe>> {
        let changed = {
            let conn = db.conn()?;
            conn.execute(
                "UPDATE Recipe SET is_favorite = NOT is_favorite, updated_at = ?
                WHERE recipe_id = ? AND user_id = ?",
                params![current_timestamp(), recipe_id, user_id],
            )?
        };
        if changed == 0 {
            return Ok(None);
        }
        User::recompute_counters(db, user_id)?;
        Self::get_for_user(db, recipe_id, user_id)
    }

    /// Returns false if the recipe doesn't exist or belongs to someone else.
    pub fn delete_for_user(db: &Database, recipe_id: i64, user_id: i64) -> Result<bool> {
        let deleted = {
            let conn = db.conn()?;
            conn.execute(
                "DELETE FROM Recipe WHERE recipe_id = ? AND user_id = ?",
                params![recipe_id, user_id],
            )?
        };
        if deleted > 0 {
            User::recompute_counters(db, user_id)?;
        }
        Ok(deleted > 0)
    }

    pub fn recent_for_user(db: &Database, user_id: i64, limit: u32) -> Result<Vec<RecentRecipe>> {
        db.collect_rows(
            "SELECT recipe_id, title, category, created_at FROM Recipe
            WHERE user_id = ?
            ORDER BY created_at DESC, recipe_id DESC
            LIMIT ?",
            params![user_id, limit],
        )
    }

    pub fn count_for_user(db: &Database, user_id: i64) -> Result<i64> {
        db.count("SELECT COUNT(*) FROM Recipe WHERE user_id = ?", params![user_id])
    }

    pub fn count_favorites_for_user(db: &Database, user_id: i64) -> Result<i64> {
        db.count(
            "SELECT COUNT(*) FROM Recipe WHERE user_id = ? AND is_favorite = 1",
            params![user_id],
        )
    }

    pub fn count_all(db: &Database) -> Result<i64> {
        db.count("SELECT COUNT(*) FROM Recipe", params![])
    }
}
