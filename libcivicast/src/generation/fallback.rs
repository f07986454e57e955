//! Deterministic template copy used when the model reply is unusable

use crate::types::{Platform, Variation};

const EXCERPT_CHARS: usize = 200;
const SHORT_EXCERPT_CHARS: usize = 100;
const DERIVED_TITLE_CHARS: usize = 80;

struct Template {
    platform: Platform,
    angle: &'static str,
    rationale: &'static str,
    render: fn(&str, &str) -> String,
}

const TEMPLATES: [Template; 5] = [
    Template {
        platform: Platform::Twitter,
        angle: "Question Hook",
        rationale: "Engages audience with direct question",
        render: |title, _| format!("{}\n\nWhat are your thoughts? 🤔", title),
    },
    Template {
        platform: Platform::Facebook,
        angle: "Direct Statement",
        rationale: "Clear and informative for Facebook audience",
        render: |title, excerpt| format!("{}\n\n{}...\n\n#civictech #localgov", title, excerpt),
    },
    Template {
        platform: Platform::Linkedin,
        angle: "Professional Insight",
        rationale: "Professional tone for LinkedIn network",
        render: |title, excerpt| {
            format!(
                "{}\n\nKey insights:\n• {}\n\n#PublicSector #Government",
                title,
                take_chars(excerpt, SHORT_EXCERPT_CHARS)
            )
        },
    },
    Template {
        platform: Platform::Instagram,
        angle: "Visual Focus",
        rationale: "Visual and engaging for Instagram",
        render: |title, excerpt| {
            format!(
                "{} ✨\n\n{}...\n\n#civictech #community #innovation",
                title,
                take_chars(excerpt, SHORT_EXCERPT_CHARS)
            )
        },
    },
    Template {
        platform: Platform::Twitter,
        angle: "Call-to-Action",
        rationale: "Direct CTA for engagement",
        render: |title, _| format!("{}\n\nRead more about this important topic →", title),
    },
];

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Cut `text` to the platform limit, ending with an ellipsis when cut
pub fn truncate_for(platform: Platform, text: &str) -> String {
    let limit = platform.character_limit();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit - 1).collect();
    cut.push('…');
    cut
}

/// Template batch covering every requested platform at least once
///
/// Platforms with more than one template get up to `posts_per_platform`.
pub fn fallback_variations(
    title: Option<&str>,
    content: &str,
    platforms: &[Platform],
    posts_per_platform: usize,
) -> Vec<Variation> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let first_line = content.lines().next().unwrap_or("").trim();
            take_chars(first_line, DERIVED_TITLE_CHARS)
        });
    let excerpt = take_chars(content.trim(), EXCERPT_CHARS);
    let per_platform = posts_per_platform.max(1);

    let mut variations = Vec::new();
    for platform in platforms {
        let templates = TEMPLATES
            .iter()
            .filter(|t| t.platform == *platform)
            .take(per_platform);
        for template in templates {
            let text = (template.render)(&title, &excerpt);
            variations.push(Variation {
                angle: template.angle.to_string(),
                platform: *platform,
                text: truncate_for(*platform, &text),
                rationale: template.rationale.to_string(),
                selected: false,
                image_url: None,
                link: None,
            });
        }
    }
    variations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_covers_every_platform() {
        let variations = fallback_variations(
            Some("Park Opens"),
            "New playground opens Saturday",
            &Platform::ALL,
            5,
        );
        for platform in Platform::ALL {
            assert!(variations.iter().any(|v| v.platform == platform));
        }
        assert_eq!(variations.len(), 5);
        assert!(variations.iter().all(|v| v.fits_platform()));
    }

    #[test]
    fn test_fallback_respects_per_platform_count() {
        let variations = fallback_variations(Some("Park Opens"), "Body", &[Platform::Twitter], 1);
        assert_eq!(variations.len(), 1);
        assert_eq!(variations[0].angle, "Question Hook");
        assert!(variations[0].text.starts_with("Park Opens\n\nWhat are your thoughts?"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = fallback_variations(Some("T"), "C", &[Platform::Facebook], 5);
        let b = fallback_variations(Some("T"), "C", &[Platform::Facebook], 5);
        assert_eq!(a, b);
        assert_eq!(a[0].text, "T\n\nC...\n\n#civictech #localgov");
    }

    #[test]
    fn test_fallback_derives_title_from_content() {
        let variations = fallback_variations(
            None,
            "Council approves budget\nThe vote was 5-2.",
            &[Platform::Twitter],
            1,
        );
        assert!(variations[0].text.starts_with("Council approves budget\n\n"));
    }

    #[test]
    fn test_fallback_truncates_long_titles() {
        let title = "Long ".repeat(100);
        let variations = fallback_variations(Some(&title), "x", &[Platform::Twitter], 2);
        assert_eq!(variations.len(), 2);
        for v in &variations {
            assert!(v.text.chars().count() <= 280);
            assert!(v.text.ends_with('…'));
        }
    }

    #[test]
    fn test_truncate_for_short_text_unchanged() {
        assert_eq!(truncate_for(Platform::Twitter, "short"), "short");
    }
}
