//! Session view-model: utensil toggles, ingredients and the generated text,
//! kept in an immutable record and changed only through `reduce`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecipeGenError;
use crate::prompt::build_prompt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Utensil {
    Oven,
    Microwave,
    Blender,
    Grill,
}

impl Utensil {
    pub const ALL: [Utensil; 4] = [Self::Oven, Self::Microwave, Self::Blender, Self::Grill];

    /// Label shown to the user and substituted into the prompt.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Oven => "Fogão",
            Self::Microwave => "Microondas",
            Self::Blender => "Liquidificador",
            Self::Grill => "Churrasqueira",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Oven => "oven",
            Self::Microwave => "microwave",
            Self::Blender => "blender",
            Self::Grill => "grill",
        }
    }
}

impl FromStr for Utensil {
    type Err = RecipeGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|u| u.key() == needle || u.display_name().to_lowercase() == needle)
            .ok_or_else(|| {
                RecipeGenError::Validation(format!(
                    "unknown utensil '{s}' (expected one of: oven, microwave, blender, grill)"
                ))
            })
    }
}

/// Which utensils the user has. All off initially.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct UtensilToggles {
    pub oven: bool,
    pub microwave: bool,
    pub blender: bool,
    pub grill: bool,
}

impl UtensilToggles {
    pub fn is_on(&self, u: Utensil) -> bool {
        match u {
            Utensil::Oven => self.oven,
            Utensil::Microwave => self.microwave,
            Utensil::Blender => self.blender,
            Utensil::Grill => self.grill,
        }
    }

    pub fn with(self, u: Utensil, on: bool) -> Self {
        let mut next = self;
        match u {
            Utensil::Oven => next.oven = on,
            Utensil::Microwave => next.microwave = on,
            Utensil::Blender => next.blender = on,
            Utensil::Grill => next.grill = on,
        }
        next
    }

    /// Display names of the enabled utensils, in fixed order.
    pub fn selected_names(&self) -> Vec<&'static str> {
        Utensil::ALL
            .into_iter()
            .filter(|u| self.is_on(*u))
            .map(|u| u.display_name())
            .collect()
    }
}

impl FromIterator<Utensil> for UtensilToggles {
    fn from_iter<I: IntoIterator<Item = Utensil>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::default(), |acc, u| acc.with(u, true))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub ingredients: String,
    pub utensils: UtensilToggles,
    pub generated_text: String,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    /// Only one generation per session at a time.
    pub fn can_generate(&self) -> bool {
        !self.loading
    }

    pub fn prompt(&self) -> String {
        build_prompt(&self.ingredients, &self.utensils.selected_names())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetIngredients(String),
    Toggle { utensil: Utensil, on: bool },
    GenerationStarted,
    FragmentReceived(String),
    GenerationFinished,
    GenerationFailed(String),
}

pub fn reduce(state: &SessionState, action: Action) -> SessionState {
    match action {
        Action::SetIngredients(ingredients) => SessionState {
            ingredients,
            ..state.clone()
        },
        Action::Toggle { utensil, on } => SessionState {
            utensils: state.utensils.with(utensil, on),
            ..state.clone()
        },
        Action::GenerationStarted => SessionState {
            generated_text: String::new(),
            loading: true,
            last_error: None,
            ..state.clone()
        },
        Action::FragmentReceived(text) => {
            let mut next = state.clone();
            next.generated_text.push_str(&text);
            next
        }
        Action::GenerationFinished => SessionState {
            loading: false,
            ..state.clone()
        },
        Action::GenerationFailed(message) => SessionState {
            loading: false,
            last_error: Some(message),
            ..state.clone()
        },
    }
}
