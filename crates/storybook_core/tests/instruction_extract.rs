use storybook_core::{
    extract_image_instructions, extract_parts, truncate_at_word_boundary,
    DEFAULT_INSTRUCTION_MAX_LEN,
};

const LANTERN_TEXT: &str = "A tall woman standing near a castle in a dark forest holding a lantern.";

#[test]
fn combines_setting_character_and_action_in_order() {
    let instruction = extract_image_instructions(Some(LANTERN_TEXT), DEFAULT_INSTRUCTION_MAX_LEN);
    assert_eq!(instruction, "in a dark forest, a tall woman, holding a lantern");
}

#[test]
fn collects_every_character_phrase() {
    let text = "On a sunny hill, a small old man met a kind young woman and a shy forest creature, \
                sitting under an oak.";
    let parts = extract_parts(text);

    assert_eq!(parts.setting.as_deref(), Some("on a sunny hill"));
    assert_eq!(
        parts.characters,
        vec![
            "a small old man".to_string(),
            "a kind young woman".to_string(),
            "a shy forest creature".to_string(),
        ]
    );
    assert_eq!(parts.action.as_deref(), Some("sitting under an oak"));

    let instruction = extract_image_instructions(Some(text), DEFAULT_INSTRUCTION_MAX_LEN);
    assert_eq!(
        instruction,
        "on a sunny hill, a small old man, a kind young woman, a shy forest creature, sitting under an oak"
    );
}

#[test]
fn skips_missing_pieces() {
    let only_action = extract_image_instructions(Some("The dragon was lying in wait."), 500);
    assert_eq!(only_action, "lying in wait");

    let only_setting = extract_image_instructions(Some("We met at the old harbor."), 500);
    assert_eq!(only_setting, "at the old harbor");
}

#[test]
fn unmatched_or_absent_text_yields_empty_string() {
    assert_eq!(extract_image_instructions(None, 500), "");
    assert_eq!(extract_image_instructions(Some(""), 500), "");
    assert_eq!(
        extract_image_instructions(Some("Nothing to see here. Just words!"), 500),
        ""
    );
    assert!(extract_parts("plain words").is_empty());
}

#[test]
fn truncates_to_word_boundary_within_budget() {
    let truncated = truncate_at_word_boundary("in a forest, a tall woman", 10);
    assert!(truncated.chars().count() <= 10);
    assert_eq!(truncated, "in a");
    assert!("in a forest, a tall woman".starts_with(truncated));

    let extracted = extract_image_instructions(Some("in a forest, a tall woman"), 10);
    assert_eq!(extracted, "in a");
}

#[test]
fn truncated_output_is_prefix_and_never_mid_word() {
    let full = extract_image_instructions(Some(LANTERN_TEXT), DEFAULT_INSTRUCTION_MAX_LEN);

    for max_len in 1..full.chars().count() {
        let truncated = extract_image_instructions(Some(LANTERN_TEXT), max_len);
        assert!(truncated.chars().count() <= max_len, "max_len={max_len}");
        assert!(full.starts_with(&truncated), "max_len={max_len}");

        let prefix: String = full.chars().take(max_len).collect();
        if prefix.contains(' ') && !truncated.is_empty() {
            let next = full[truncated.len()..].chars().next();
            assert!(
                matches!(next, Some(' ') | Some(',')),
                "max_len={max_len} cut mid-word: {truncated:?}"
            );
        }
    }
}

#[test]
fn long_instructions_are_bounded_by_default_budget() {
    let characters = (0..80)
        .map(|idx| format!("a brave number{idx} knight man"))
        .collect::<Vec<_>>()
        .join(" and ");
    let text = format!("In a vast kingdom, {characters}, holding a banner.");

    let instruction = extract_image_instructions(Some(&text), DEFAULT_INSTRUCTION_MAX_LEN);
    assert!(instruction.chars().count() <= DEFAULT_INSTRUCTION_MAX_LEN);
    assert!(instruction.starts_with("in a vast kingdom, a brave number0 knight man"));
    assert!(!instruction.ends_with(','));
}
