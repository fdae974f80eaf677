//! Prompt construction. Deterministic: same ingredients and utensils, same prompt.

use crate::normalizer::{normalize_ingredients, normalize_utensils};

/// Comma-joined utensil list, e.g. `Fogão, Microondas`.
pub fn join_utensils<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_prompt<S: AsRef<str>>(ingredients: &str, utensils: &[S]) -> String {
    let ingredients = normalize_ingredients(ingredients);
    let utensils = join_utensils(&normalize_utensils(utensils));
    format!(
        "Imagine que você é um chef mundialmente famoso. \
Você é desafiado a criar uma receita de refeição seguindo rigorosamente estas regras.\n\
Você só pode usar os seguintes ingredientes: {ingredients},\n\
Você deve usar apenas os ingredientes na lista fornecida. Nenhum outro ingrediente pode ser usado.\n\
Você só pode usar os seguintes utensílios de cozinha para criar sua receita: {utensils}.\n\
Suponha que a receita deva ser preparada por uma pessoa comum que não seja um chef experiente.\n\
No final da receita, liste claramente os macronutrientes da receita.\n\
Sua resposta deve rotular claramente com \"Nome da receita\", \"Ingredientes\", \"Dificuldade\", \
\"Tempo de cozimento\", \"Ferramentas necessárias\", \"Instruções\", \"Macronutrientes\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_comma_space() {
        assert_eq!(join_utensils(&["Fogão", "Microondas"]), "Fogão, Microondas");
        assert_eq!(join_utensils::<&str>(&[]), "");
        assert_eq!(join_utensils(&["Churrasqueira"]), "Churrasqueira");
    }

    #[test]
    fn prompt_substitutes_inputs() {
        let p = build_prompt("  2 ovos, farinha ", &["Fogão", "Liquidificador"]);
        assert!(p.contains("seguintes ingredientes: 2 ovos, farinha,\nVocê deve usar apenas"));
        assert!(p.contains("utensílios de cozinha para criar sua receita: Fogão, Liquidificador.\n"));
        assert!(p.starts_with("Imagine que você é um chef mundialmente famoso. Você é desafiado"));
        assert!(p.ends_with("\"Macronutrientes\"."));
    }

    #[test]
    fn ingredient_text_is_kept_as_typed() {
        let p = build_prompt("ovos\n\nleite, leite", &["Fogão"]);
        assert!(p.contains("ingredientes: ovos\n\nleite, leite,\n"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_prompt("arroz", &["Microondas"]);
        let b = build_prompt("arroz", &["Microondas"]);
        assert_eq!(a, b);
    }
}
