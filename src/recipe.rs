//! Recipe model consumed by a cook-along session

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recipe file errors
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("Failed to read recipe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse recipe: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single ingredient line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Identifier used when checking the ingredient off
    pub id: String,
    pub name: String,
    /// Free-form quantity such as "2 tbsp"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl Ingredient {
    /// Human-readable line, e.g. "2 tbsp olive oil"
    pub fn display_line(&self) -> String {
        match &self.quantity {
            Some(quantity) if !quantity.trim().is_empty() => {
                format!("{} {}", quantity.trim(), self.name)
            }
            _ => self.name.clone(),
        }
    }
}

/// A recipe as far as the voice session is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Ordered instruction steps
    pub steps: Vec<String>,
}

impl Recipe {
    /// Number of instruction steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Text of the step at a 0-based index
    pub fn step(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// Whether an ingredient with the given id exists
    pub fn has_ingredient(&self, id: &str) -> bool {
        self.ingredients.iter().any(|i| i.id == id)
    }

    /// Load a recipe from a JSON file
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialise_minimal_recipe() {
        let json = r#"{"id":"r1","title":"Toast","steps":["Toast the bread"]}"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.step_count(), 1);
        assert!(recipe.ingredients.is_empty());
        assert_eq!(recipe.servings, None);
        assert_eq!(recipe.step(0), Some("Toast the bread"));
        assert_eq!(recipe.step(1), None);
    }

    #[test]
    fn test_ingredient_display_line() {
        let with_quantity = Ingredient {
            id: "oil".to_string(),
            name: "olive oil".to_string(),
            quantity: Some("2 tbsp".to_string()),
        };
        assert_eq!(with_quantity.display_line(), "2 tbsp olive oil");

        let without = Ingredient {
            id: "salt".to_string(),
            name: "salt".to_string(),
            quantity: Some("  ".to_string()),
        };
        assert_eq!(without.display_line(), "salt");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toast.json");
        std::fs::write(
            &path,
            r#"{"id":"toast","title":"Toast","servings":1,"steps":["Toast for 2 minutes","Butter"]}"#,
        )
        .unwrap();

        let recipe = Recipe::load(&path).unwrap();
        assert_eq!(recipe.title, "Toast");
        assert_eq!(recipe.servings, Some(1));
        assert!(!recipe.has_ingredient("butter"));

        assert!(matches!(
            Recipe::load(&dir.path().join("missing.json")),
            Err(RecipeError::Io(_))
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Recipe::load(&path), Err(RecipeError::Parse(_))));
    }
}
