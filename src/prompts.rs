pub const VIDEO_EXPLANATION: &str = include_str!("../data/prompts/video_explanation.txt");
pub const EXPLANATION: &str = include_str!("../data/prompts/explanation.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Explain {{concept}}!", &[("concept", "tides")]),
            "Explain tides!"
        );
    }

    #[test]
    fn test_render_repeated_var() {
        assert_eq!(
            render("{{a}} then {{a}}", &[("a", "waves")]),
            "waves then waves"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!VIDEO_EXPLANATION.is_empty());
        assert!(!EXPLANATION.is_empty());
    }

    #[test]
    fn test_prompts_have_concept_placeholder() {
        assert!(VIDEO_EXPLANATION.contains("{{concept}}"));
        assert!(EXPLANATION.contains("{{concept}}"));
    }
}
