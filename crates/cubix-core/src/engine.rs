//! Conversation state machine
//!
//! [`transition`] is pure and total: given a session snapshot and trimmed
//! input it always yields one next state and a non-empty reply plan. Image
//! lookup is the only I/O-adjacent step and happens later, in [`render`],
//! so the session critical section never waits on the asset namespace.

use crate::menu;
use crate::session::{ConvState, Session};
use cubix_catalog::resolve::{self, AssetNamespace};
use cubix_catalog::{Catalog, Category, GroupIndex};
use cubix_ipc::OutboundMessage;

/// One step of the reply plan, before image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Algorithm {
        category: Category,
        label: String,
        notation: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ConvState,
    pub group: Option<String>,
    pub replies: Vec<Reply>,
}

pub fn transition(catalog: &Catalog, session: &Session, input: &str) -> Transition {
    match session.state {
        ConvState::Initial => Transition {
            state: ConvState::Menu,
            group: session.group.clone(),
            replies: vec![
                Reply::Text(menu::WELCOME.to_string()),
                Reply::Text(menu::main_menu()),
            ],
        },
        ConvState::Menu => main_menu_input(catalog, session, input),
        ConvState::F2l => category_input(catalog, session, Category::F2l, input),
        ConvState::Oll => category_input(catalog, session, Category::Oll, input),
        ConvState::Pll => pll_input(catalog, session, input),
        ConvState::F2lGroup => group_input(catalog, session, Category::F2l, input),
        ConvState::OllGroup => group_input(catalog, session, Category::Oll, input),
    }
}

fn flat_state(category: Category) -> ConvState {
    match category {
        Category::F2l => ConvState::F2l,
        Category::Oll => ConvState::Oll,
        Category::Pll => ConvState::Pll,
    }
}

fn group_state(category: Category) -> ConvState {
    match category {
        Category::F2l => ConvState::F2lGroup,
        Category::Oll => ConvState::OllGroup,
        // PLL has no groups; its flat state is the only browsing state.
        Category::Pll => ConvState::Pll,
    }
}

fn category_menu_replies(catalog: &Catalog, category: Category) -> Vec<Reply> {
    match category {
        Category::Pll => vec![Reply::Text(menu::pll_menu(catalog))],
        _ => vec![Reply::Text(menu::category_menu(category))],
    }
}

fn main_menu_input(catalog: &Catalog, session: &Session, input: &str) -> Transition {
    let lower = input.to_lowercase();

    let chosen = if input == "1" || lower.contains("f2l") {
        Some(Category::F2l)
    } else if input == "2" || lower.contains("oll") {
        Some(Category::Oll)
    } else if input == "3" || lower.contains("pll") {
        Some(Category::Pll)
    } else {
        None
    };

    match chosen {
        Some(category) => Transition {
            state: flat_state(category),
            group: session.group.clone(),
            replies: category_menu_replies(catalog, category),
        },
        None => Transition {
            state: ConvState::Menu,
            group: session.group.clone(),
            replies: vec![
                Reply::Text(menu::INVALID_OPTION.to_string()),
                Reply::Text(menu::main_menu()),
            ],
        },
    }
}

fn case_info_replies(catalog: &Catalog, category: Category, label: &str) -> Vec<Reply> {
    match resolve::resolve_algorithm(catalog, category, label) {
        Some(notation) => vec![Reply::Algorithm {
            category,
            label: label.to_string(),
            notation: notation.to_string(),
        }],
        None => vec![Reply::Text(menu::case_not_found(label))],
    }
}

/// Flat F2L/OLL browsing. Numbers inside the category's case range are
/// cases; numbers outside are tried as 1-based group indices. Group indices
/// shadowed by the case range stay unreachable numerically, as curated.
fn category_input(catalog: &Catalog, session: &Session, category: Category, input: &str) -> Transition {
    let unchanged = |replies: Vec<Reply>| Transition {
        state: session.state,
        group: session.group.clone(),
        replies,
    };

    if input == "0" {
        return Transition {
            state: ConvState::Menu,
            group: session.group.clone(),
            replies: vec![Reply::Text(menu::main_menu())],
        };
    }

    let max_case = category.numeric_case_count().unwrap_or(0);

    if let Ok(n) = input.parse::<i64>() {
        if (1..=max_case).contains(&n) {
            let label = resolve::canonical_label(n);
            return unchanged(case_info_replies(catalog, category, &label));
        }

        return match GroupIndex::group_at(category, n) {
            Some(group) => Transition {
                state: group_state(category),
                group: Some(group.name.to_string()),
                replies: vec![
                    Reply::Text(menu::group_header(category, group.name)),
                    Reply::Text(menu::group_case_list(group)),
                ],
            },
            None => unchanged(vec![
                Reply::Text(menu::INVALID_GROUP.to_string()),
                Reply::Text(menu::category_menu(category)),
            ]),
        };
    }

    if input.starts_with("Caso ") {
        return unchanged(case_info_replies(catalog, category, input));
    }

    unchanged(vec![
        Reply::Text(menu::INVALID_OPTION.to_string()),
        Reply::Text(menu::category_menu(category)),
    ])
}

/// PLL browsing: exact key, then upper-cased key, then "Caso {input}",
/// first hit wins.
fn pll_input(catalog: &Catalog, session: &Session, input: &str) -> Transition {
    let unchanged = |replies: Vec<Reply>| Transition {
        state: ConvState::Pll,
        group: session.group.clone(),
        replies,
    };

    if input == "0" {
        return Transition {
            state: ConvState::Menu,
            group: session.group.clone(),
            replies: vec![Reply::Text(menu::main_menu())],
        };
    }

    let upper = input.to_uppercase();
    let prefixed = format!("Caso {}", input);
    let label = if catalog.contains(Category::Pll, input) {
        Some(input.to_string())
    } else if catalog.contains(Category::Pll, &upper) {
        Some(upper)
    } else if catalog.contains(Category::Pll, &prefixed) {
        Some(prefixed)
    } else {
        None
    };

    match label {
        Some(label) => unchanged(case_info_replies(catalog, Category::Pll, &label)),
        None => unchanged(vec![
            Reply::Text(menu::INVALID_CASE.to_string()),
            Reply::Text(menu::pll_menu(catalog)),
        ]),
    }
}

/// Group browsing. A missing or stale group context falls back to the
/// owning category's menu and flat state.
fn group_input(catalog: &Catalog, session: &Session, category: Category, input: &str) -> Transition {
    let back_to_category = Transition {
        state: flat_state(category),
        group: None,
        replies: vec![Reply::Text(menu::category_menu(category))],
    };

    if input == "0" {
        return back_to_category;
    }

    let group = match session
        .group
        .as_deref()
        .and_then(|name| GroupIndex::group_named(category, name))
    {
        Some(group) => group,
        None => return back_to_category,
    };

    let unchanged = |replies: Vec<Reply>| Transition {
        state: session.state,
        group: session.group.clone(),
        replies,
    };

    if group.contains(input) {
        return unchanged(case_info_replies(catalog, category, input));
    }

    if let Ok(n) = input.parse::<i64>() {
        let label = resolve::canonical_label(n);
        if group.contains(&label) {
            return unchanged(case_info_replies(catalog, category, &label));
        }
    }

    unchanged(vec![Reply::Text(menu::INVALID_CASE.to_string())])
}

/// Resolves each planned reply to a concrete outbound message: an image
/// send with caption when the case asset exists, or the plain-text
/// algorithm otherwise.
pub async fn render(
    assets: &dyn AssetNamespace,
    recipient: &str,
    replies: Vec<Reply>,
) -> Vec<OutboundMessage> {
    let mut messages = Vec::with_capacity(replies.len());

    for reply in replies {
        match reply {
            Reply::Text(text) => messages.push(OutboundMessage::text(recipient, text)),
            Reply::Algorithm {
                category,
                label,
                notation,
            } => match resolve::resolve_image(assets, category, &label).await {
                Some(asset_ref) => messages.push(OutboundMessage::image(
                    recipient,
                    asset_ref,
                    menu::case_caption(&label, &notation),
                )),
                None => messages.push(OutboundMessage::text(
                    recipient,
                    menu::case_text_fallback(&label, &notation),
                )),
            },
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubix_ipc::OutboundBody;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{
                "F2L": {
                    "Caso 1": "U R U' R'",
                    "Caso 5": "R U R' U' R U R'",
                    "Caso 10": "U' R U' R' U R U R'",
                    "Caso 37": "R2 U2 R' U' R U' R' U2 R'"
                },
                "OLL": {
                    "Caso 1": "R U2 R2 F R F' U2 R' F R F'",
                    "Caso 57": "R U R' U' M' U R U' r'"
                },
                "PLL": {
                    "UA": "R2 U R U R' U' R' U' R' U R'",
                    "Z": "M2 U M2 U M' U2 M2 U2 M'",
                    "T": "R U R' U' R' F R2 U' R' U' R U R' F'",
                    "Caso Especial": "M2 U2 M2"
                }
            }"#,
        )
        .expect("catalog")
    }

    fn session(state: ConvState) -> Session {
        Session { state, group: None }
    }

    fn group_session(state: ConvState, group: &str) -> Session {
        Session {
            state,
            group: Some(group.to_string()),
        }
    }

    fn texts(transition: &Transition) -> Vec<&str> {
        transition
            .replies
            .iter()
            .map(|reply| match reply {
                Reply::Text(text) => text.as_str(),
                Reply::Algorithm { label, .. } => label.as_str(),
            })
            .collect()
    }

    struct NoAssets;

    #[async_trait::async_trait]
    impl AssetNamespace for NoAssets {
        async fn contains(&self, _category: Category, _file_name: &str) -> bool {
            false
        }

        fn asset_ref(&self, category: Category, file_name: &str) -> String {
            format!("{}/{}", category.as_str(), file_name)
        }
    }

    struct AllAssets;

    #[async_trait::async_trait]
    impl AssetNamespace for AllAssets {
        async fn contains(&self, _category: Category, _file_name: &str) -> bool {
            true
        }

        fn asset_ref(&self, category: Category, file_name: &str) -> String {
            format!("{}/{}", category.as_str(), file_name)
        }
    }

    #[test]
    fn first_contact_sends_welcome_and_menu() {
        let t = transition(&catalog(), &session(ConvState::Initial), "hi");
        assert_eq!(t.state, ConvState::Menu);
        let texts = texts(&t);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Bem-vindo"));
        assert!(texts[1].contains("MENU SPEEDCUBING ASSISTANT"));
    }

    #[test]
    fn menu_accepts_numbers_and_keywords() {
        let catalog = catalog();
        let t = transition(&catalog, &session(ConvState::Menu), "1");
        assert_eq!(t.state, ConvState::F2l);
        assert!(texts(&t)[0].contains("F2L - GRUPOS"));
        assert!(texts(&t)[0].contains("(1-41)"));

        let t = transition(&catalog, &session(ConvState::Menu), "quero OLL");
        assert_eq!(t.state, ConvState::Oll);

        let t = transition(&catalog, &session(ConvState::Menu), "3");
        assert_eq!(t.state, ConvState::Pll);
        assert!(texts(&t)[0].contains("- *UA*"));
    }

    #[test]
    fn invalid_menu_input_is_idempotent() {
        let catalog = catalog();
        let mut current = session(ConvState::Menu);
        for _ in 0..3 {
            let t = transition(&catalog, &current, "what?");
            assert_eq!(t.state, ConvState::Menu);
            assert_eq!(texts(&t)[0], menu::INVALID_OPTION);
            current.state = t.state;
            current.group = t.group;
        }
    }

    #[test]
    fn category_number_in_range_resolves_case() {
        let t = transition(&catalog(), &session(ConvState::F2l), "5");
        assert_eq!(t.state, ConvState::F2l);
        assert_eq!(
            t.replies,
            vec![Reply::Algorithm {
                category: Category::F2l,
                label: "Caso 5".to_string(),
                notation: "R U R' U' R U R'".to_string(),
            }]
        );
    }

    #[test]
    fn category_number_out_of_range_is_invalid_group() {
        let t = transition(&catalog(), &session(ConvState::F2l), "50");
        assert_eq!(t.state, ConvState::F2l);
        assert!(t.group.is_none());
        let texts = texts(&t);
        assert_eq!(texts[0], menu::INVALID_GROUP);
        assert!(texts[1].contains("F2L - GRUPOS"));
    }

    #[test]
    fn oll_range_reaches_case_57() {
        let t = transition(&catalog(), &session(ConvState::Oll), "57");
        assert_eq!(t.state, ConvState::Oll);
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "Caso 57"));
    }

    #[test]
    fn oll_number_above_case_range_is_invalid_group() {
        // OLL has 9 groups but 57 cases, so every group index is shadowed
        // by the case range; 58 falls through to the invalid-group branch.
        let t = transition(&catalog(), &session(ConvState::Oll), "58");
        assert_eq!(t.state, ConvState::Oll);
        assert_eq!(texts(&t)[0], menu::INVALID_GROUP);
    }

    #[test]
    fn category_zero_returns_to_main_menu() {
        let t = transition(&catalog(), &session(ConvState::Oll), "0");
        assert_eq!(t.state, ConvState::Menu);
        assert!(texts(&t)[0].contains("MENU SPEEDCUBING ASSISTANT"));
    }

    #[test]
    fn category_accepts_explicit_case_labels() {
        let t = transition(&catalog(), &session(ConvState::F2l), "Caso 05");
        assert_eq!(t.state, ConvState::F2l);
        assert!(matches!(&t.replies[0], Reply::Algorithm { notation, .. } if notation == "R U R' U' R U R'"));

        let t = transition(&catalog(), &session(ConvState::F2l), "Caso 99");
        assert_eq!(t.replies, vec![Reply::Text(menu::case_not_found("Caso 99"))]);
    }

    #[test]
    fn pll_matches_exact_then_upper_then_prefixed() {
        let catalog = catalog();
        let t = transition(&catalog, &session(ConvState::Pll), "ua");
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "UA"));

        let t = transition(&catalog, &session(ConvState::Pll), "Z");
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "Z"));

        let t = transition(&catalog, &session(ConvState::Pll), "Especial");
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "Caso Especial"));

        let t = transition(&catalog, &session(ConvState::Pll), "nope");
        assert_eq!(t.state, ConvState::Pll);
        let texts = texts(&t);
        assert_eq!(texts[0], menu::INVALID_CASE);
        assert!(texts[1].contains("PLL - CASOS"));
    }

    #[test]
    fn group_round_trip_clears_context() {
        let catalog = catalog();
        let entered = group_session(ConvState::F2lGroup, "Casos Avançados");

        let t = transition(&catalog, &entered, "37");
        assert_eq!(t.state, ConvState::F2lGroup);
        assert_eq!(t.group.as_deref(), Some("Casos Avançados"));
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "Caso 37"));

        let t = transition(&catalog, &entered, "0");
        assert_eq!(t.state, ConvState::F2l);
        assert!(t.group.is_none());
        assert!(texts(&t)[0].contains("F2L - GRUPOS"));
    }

    #[test]
    fn group_accepts_verbatim_labels_and_rejects_outsiders() {
        let catalog = catalog();
        let entered = group_session(ConvState::F2lGroup, "Casos Avançados");

        let t = transition(&catalog, &entered, "Caso 37");
        assert!(matches!(&t.replies[0], Reply::Algorithm { label, .. } if label == "Caso 37"));

        // Caso 5 exists in the catalog but not in this group.
        let t = transition(&catalog, &entered, "5");
        assert_eq!(t.state, ConvState::F2lGroup);
        assert_eq!(t.replies, vec![Reply::Text(menu::INVALID_CASE.to_string())]);
    }

    #[test]
    fn stale_group_context_falls_back_to_category_menu() {
        let catalog = catalog();
        let t = transition(&catalog, &session(ConvState::OllGroup), "Caso 1");
        assert_eq!(t.state, ConvState::Oll);
        assert!(t.group.is_none());
        assert!(texts(&t)[0].contains("OLL - GRUPOS"));

        let stale = group_session(ConvState::OllGroup, "No Such Group");
        let t = transition(&catalog, &stale, "Caso 1");
        assert_eq!(t.state, ConvState::Oll);
        assert!(t.group.is_none());
    }

    #[test]
    fn every_state_answers_arbitrary_input() {
        let catalog = catalog();
        let states = [
            ConvState::Initial,
            ConvState::Menu,
            ConvState::F2l,
            ConvState::Oll,
            ConvState::Pll,
            ConvState::F2lGroup,
            ConvState::OllGroup,
        ];
        for state in states {
            for input in ["", "0", "7", "-3", "9999", "Caso 05", "xyzzy!!", "ua"] {
                let t = transition(&catalog, &session(state), input);
                assert!(
                    !t.replies.is_empty(),
                    "state {:?} swallowed input {:?}",
                    state,
                    input
                );
            }
        }
    }

    #[tokio::test]
    async fn render_falls_back_to_text_without_assets() {
        let replies = vec![Reply::Algorithm {
            category: Category::F2l,
            label: "Caso 5".to_string(),
            notation: "R U R'".to_string(),
        }];
        let messages = render(&NoAssets, "5511999990000", replies).await;
        assert_eq!(messages.len(), 1);
        match &messages[0].body {
            OutboundBody::Text { text } => {
                assert!(text.contains("⚠️ Imagem não encontrada"));
                assert!(text.contains("`R U R'`"));
            }
            other => panic!("expected text fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn render_prefers_image_with_caption() {
        let replies = vec![Reply::Algorithm {
            category: Category::F2l,
            label: "Caso 5".to_string(),
            notation: "R U R'".to_string(),
        }];
        let messages = render(&AllAssets, "5511999990000", replies).await;
        match &messages[0].body {
            OutboundBody::Image { asset_ref, caption } => {
                assert_eq!(asset_ref, "F2L/F2L_Caso 5.png");
                assert_eq!(caption, "*Caso 5*\n`R U R'`");
            }
            other => panic!("expected image, got {:?}", other),
        }
    }
}
