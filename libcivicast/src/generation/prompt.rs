//! Prompt construction for variation generation

use crate::types::{Platform, Variation, ANGLES};

pub const SYSTEM_PROMPT: &str =
    "You are a social media expert who creates diverse, engaging content. Always return valid JSON.";

/// Characters of each prior variation quoted back as negative context
const PRIOR_EXCERPT_CHARS: usize = 100;

pub struct PromptInput<'a> {
    pub title: Option<&'a str>,
    pub content: &'a str,
    pub platforms: &'a [Platform],
    pub posts_per_platform: usize,
    pub prior: &'a [Variation],
    pub steering_prompt: Option<&'a str>,
}

fn platform_guidance(platform: Platform) -> &'static str {
    match platform {
        Platform::Twitter => "- twitter: Max 280 characters, punchy, 1-2 hashtags",
        Platform::Facebook => "- facebook: 1-2 paragraphs, conversational, engagement-focused",
        Platform::Linkedin => "- linkedin: Professional tone, 2-3 paragraphs, business insights",
        Platform::Instagram => "- instagram: Visual-focused, 3-5 hashtags, max 2200 chars",
    }
}

fn angle_descriptions() -> String {
    const HINTS: [&str; 10] = [
        "Start with a compelling question",
        "Lead with an interesting number or data point",
        "Use storytelling approach",
        "Identify pain point, offer solution",
        "Bold or controversial statement",
        "Actionable tips format",
        "Numbered points",
        "Highlight key wisdom",
        "Inside look",
        "Direct engagement request",
    ];
    ANGLES
        .iter()
        .zip(HINTS)
        .enumerate()
        .map(|(i, (angle, hint))| format!("{}. {} - {}", i + 1, angle, hint))
        .collect::<Vec<_>>()
        .join("\n")
}

fn prior_context(prior: &[Variation]) -> String {
    if prior.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = prior
        .iter()
        .map(|v| {
            let excerpt: String = v.text.chars().take(PRIOR_EXCERPT_CHARS).collect();
            format!("- {} ({}): {}", v.platform, v.angle, excerpt)
        })
        .collect();
    format!(
        "\n\nNOTE: These posts have already been generated. Do NOT repeat their angles or openings; create DIFFERENT angles:\n{}",
        lines.join("\n")
    )
}

pub fn build_user_prompt(input: &PromptInput<'_>) -> String {
    let total = input.posts_per_platform.saturating_mul(input.platforms.len());
    let platform_names: Vec<&str> = input.platforms.iter().map(|p| p.as_str()).collect();
    let guidance: Vec<&str> = input
        .platforms
        .iter()
        .map(|p| platform_guidance(*p))
        .collect();

    let mut prompt = format!(
        r#"You are a social media expert who creates engaging, diverse content for multiple platforms.

Article Title: {title}
Article Content: {content}{prior}

Generate {total} unique social media post variations: exactly {per} for each of these platforms: {platforms}. Each should feel distinct and target different audiences or aspects of the content.

**Angle Types to Use (mix these up):**
{angles}

**Platform Optimization:**
{guidance}

**Requirements:**
- Never use the same angle twice for the same platform
- Vary the opening hooks significantly
- Include relevant hashtags
- Make each one shareable and engaging"#,
        title = input.title.unwrap_or("Not provided"),
        content = input.content,
        prior = prior_context(input.prior),
        total = total,
        per = input.posts_per_platform,
        platforms = platform_names.join(", "),
        angles = angle_descriptions(),
        guidance = guidance.join("\n"),
    );

    if let Some(steering) = input.steering_prompt.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!(
            "\n\n**Additional Instructions (must follow):**\n{}",
            steering.trim()
        ));
    }

    prompt.push_str(&format!(
        r#"

Return a JSON array with exactly {} variations:
[
  {{
    "angle": "Question Hook",
    "platform": "{}",
    "text": "The actual post text with hashtags",
    "rationale": "Why this angle works for this content"
  }},
  ...
]"#,
        total,
        platform_names.first().copied().unwrap_or("twitter")
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(platforms: &'a [Platform], prior: &'a [Variation]) -> PromptInput<'a> {
        PromptInput {
            title: Some("Park Opens"),
            content: "New playground opens Saturday",
            platforms,
            posts_per_platform: 5,
            prior,
            steering_prompt: None,
        }
    }

    #[test]
    fn test_prompt_states_counts_and_platforms() {
        let platforms = [Platform::Twitter, Platform::Linkedin];
        let prompt = build_user_prompt(&input(&platforms, &[]));
        assert!(prompt.contains("Generate 10 unique"));
        assert!(prompt.contains("exactly 5 for each of these platforms: twitter, linkedin"));
        assert!(prompt.contains("Max 280 characters"));
        assert!(prompt.contains("2-3 paragraphs"));
        assert!(!prompt.contains("3-5 hashtags"));
        assert!(prompt.contains("Article Title: Park Opens"));
        assert!(!prompt.contains("already been generated"));
    }

    #[test]
    fn test_prompt_lists_all_angles() {
        let prompt = build_user_prompt(&input(&[Platform::Twitter], &[]));
        for angle in ANGLES {
            assert!(prompt.contains(angle), "missing angle {}", angle);
        }
    }

    #[test]
    fn test_prompt_includes_abbreviated_prior_variations() {
        let long_text = format!("{}TAIL", "a".repeat(100));
        let prior = vec![Variation::new(Platform::Twitter, "Hot Take", long_text)];
        let prompt = build_user_prompt(&input(&[Platform::Twitter], &prior));
        assert!(prompt.contains("already been generated"));
        assert!(prompt.contains("- twitter (Hot Take): "));
        assert!(!prompt.contains("TAIL"));
    }

    #[test]
    fn test_prompt_appends_steering_directive() {
        let platforms = [Platform::Facebook];
        let mut i = input(&platforms, &[]);
        i.steering_prompt = Some("  Mention the ribbon cutting at 10am ");
        let prompt = build_user_prompt(&i);
        assert!(prompt
            .contains("**Additional Instructions (must follow):**\nMention the ribbon cutting at 10am"));
    }

    #[test]
    fn test_prompt_missing_title() {
        let platforms = [Platform::Facebook];
        let mut i = input(&platforms, &[]);
        i.title = None;
        assert!(build_user_prompt(&i).contains("Article Title: Not provided"));
    }
}
