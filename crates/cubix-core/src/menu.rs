//! Menu and notice texts
//!
//! WhatsApp-flavored Markdown, in the bot's original Portuguese.

use cubix_catalog::{Catalog, CaseGroup, Category, GroupIndex};

pub const WELCOME: &str = "Olá! Bem-vindo ao Speedcubing Assistant Bot!";
pub const INVALID_OPTION: &str = "❌ Opção inválida. Por favor, escolha uma opção válida.";
pub const INVALID_GROUP: &str = "❌ Grupo inválido. Por favor, escolha uma opção válida.";
pub const INVALID_CASE: &str = "❌ Caso inválido. Por favor, escolha um caso válido.";

/// Digit keycap emoji, e.g. 1️⃣.
fn keycap(n: usize) -> String {
    format!("{}\u{fe0f}\u{20e3}", n)
}

pub fn main_menu() -> String {
    "🧩 *MENU SPEEDCUBING ASSISTANT* 🧩\n\n\
     Escolha uma das opções abaixo:\n\n\
     1️⃣ - *F2L* (First 2 Layers)\n\
     2️⃣ - *OLL* (Orientation of Last Layer)\n\
     3️⃣ - *PLL* (Permutation of Last Layer)\n\n\
     Responda com o número ou nome da opção desejada."
        .to_string()
}

/// Group menu for F2L/OLL: one keycap line per group with its case count,
/// plus the direct case-number instruction for the category's range.
pub fn category_menu(category: Category) -> String {
    let mut text = format!(
        "🧩 *{} - GRUPOS* 🧩\n\nEscolha um dos grupos de algoritmos {}:\n\n",
        category, category
    );

    for (i, group) in GroupIndex::groups_of(category).iter().enumerate() {
        text.push_str(&format!(
            "{} - *{}* ({} casos)\n",
            keycap(i + 1),
            group.name,
            group.cases.len()
        ));
    }

    text.push_str("\n0️⃣ - Voltar ao menu principal\n");
    if let Some(max) = category.numeric_case_count() {
        text.push_str(&format!("\nOu digite o número do caso específico (1-{})", max));
    }

    text
}

/// PLL has no groups; the menu lists every case label in the catalog.
pub fn pll_menu(catalog: &Catalog) -> String {
    let mut text = "🧩 *PLL - CASOS* 🧩\n\nEscolha um dos casos de PLL:\n\n".to_string();

    for label in catalog.case_labels(Category::Pll) {
        text.push_str(&format!("- *{}*\n", label));
    }

    text.push_str("\n0️⃣ - Voltar ao menu principal");
    text
}

pub fn group_header(category: Category, group_name: &str) -> String {
    format!(
        "🧩 *{} - {}* 🧩\n\nEscolha um dos casos abaixo ou digite 0 para voltar:",
        category, group_name
    )
}

pub fn group_case_list(group: &CaseGroup) -> String {
    let mut text = String::new();
    for case in group.cases {
        text.push_str(&format!("- *{}*\n", case));
    }
    text
}

pub fn case_not_found(label: &str) -> String {
    format!("❌ Caso não encontrado: {}", label)
}

pub fn case_caption(label: &str, notation: &str) -> String {
    format!("*{}*\n`{}`", label, notation)
}

pub fn case_text_fallback(label: &str, notation: &str) -> String {
    format!(
        "⚠️ Imagem não encontrada para o caso {}, mas aqui está o algoritmo:\n\n*{}*: `{}`",
        label, label, notation
    )
}
