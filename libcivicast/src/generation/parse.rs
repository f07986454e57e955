//! Turning free-form model output into validated variations

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::types::{Platform, Variation, ANGLES};

pub const DEFAULT_RATIONALE: &str = "Engaging approach for this content";

/// Pull a JSON array out of a model reply
///
/// Tries a fenced code block first, then the outermost `[...]` span,
/// then the whole reply.
pub fn extract_json_array(raw: &str) -> Option<Vec<Value>> {
    let mut candidates = Vec::new();
    if let Some(fenced) = fenced_block(raw) {
        candidates.push(fenced);
    }
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            candidates.push(&raw[start..=end]);
        }
    }
    candidates.push(raw.trim());

    candidates.into_iter().find_map(|text| {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => Some(items),
            // Some models wrap the list in an object
            Ok(Value::Object(map)) => map
                .get("variations")
                .or_else(|| map.get("posts"))
                .and_then(Value::as_array)
                .cloned(),
            _ => None,
        }
    })
}

fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_fence = &raw[open + 3..];
    let body_start = after_fence
        .strip_prefix("json")
        .or_else(|| after_fence.strip_prefix("JSON"))
        .unwrap_or(after_fence);
    let close = body_start.find("```")?;
    Some(body_start[..close].trim())
}

/// Limits applied while normalizing a batch
pub struct NormalizeOptions<'a> {
    pub platforms: &'a [Platform],
    pub posts_per_platform: usize,
    pub max_variations: usize,
}

/// Validate raw items into variations
///
/// Items without text are dropped. An unknown or unrequested platform is
/// reassigned round-robin across the requested set. A repeated
/// `(platform, angle)` pair gets the next unused angle. Each platform keeps
/// at most `posts_per_platform` items and the batch at most `max_variations`.
pub fn normalize_items(items: &[Value], options: &NormalizeOptions<'_>) -> Vec<Variation> {
    let mut variations = Vec::new();
    let mut used: HashSet<(Platform, String)> = HashSet::new();
    let mut per_platform: HashMap<Platform, usize> = HashMap::new();
    let mut round_robin = 0usize;

    if options.platforms.is_empty() {
        return variations;
    }

    for (index, item) in items.iter().enumerate() {
        if variations.len() >= options.max_variations {
            break;
        }

        let text = string_field(item, "text")
            .or_else(|| string_field(item, "content"))
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }

        let platform = match string_field(item, "platform")
            .and_then(|p| p.parse::<Platform>().ok())
            .filter(|p| options.platforms.contains(p))
        {
            Some(p) if per_platform.get(&p).copied().unwrap_or(0) < options.posts_per_platform => p,
            _ => match next_open_platform(options, &per_platform, &mut round_robin) {
                Some(p) => p,
                None => break,
            },
        };

        let requested_angle = string_field(item, "angle")
            .unwrap_or_else(|| ANGLES[index % ANGLES.len()].to_string());
        let angle = unique_angle(platform, requested_angle, &used, index);
        used.insert((platform, angle.to_lowercase()));
        *per_platform.entry(platform).or_insert(0) += 1;

        variations.push(Variation {
            angle,
            platform,
            text,
            rationale: string_field(item, "rationale")
                .unwrap_or_else(|| DEFAULT_RATIONALE.to_string()),
            selected: false,
            image_url: None,
            link: None,
        });
    }

    variations
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Next requested platform with room left, cycling from the last pick
fn next_open_platform(
    options: &NormalizeOptions<'_>,
    per_platform: &HashMap<Platform, usize>,
    cursor: &mut usize,
) -> Option<Platform> {
    let n = options.platforms.len();
    for _ in 0..n {
        let candidate = options.platforms[*cursor % n];
        *cursor += 1;
        if per_platform.get(&candidate).copied().unwrap_or(0) < options.posts_per_platform {
            return Some(candidate);
        }
    }
    None
}

fn unique_angle(
    platform: Platform,
    requested: String,
    used: &HashSet<(Platform, String)>,
    index: usize,
) -> String {
    let taken = |angle: &str| used.contains(&(platform, angle.to_lowercase()));
    if !taken(&requested) {
        return requested;
    }
    if let Some(angle) = ANGLES.iter().find(|a| !taken(a)) {
        return angle.to_string();
    }
    let mut n = index + 1;
    loop {
        let candidate = format!("Variation {}", n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
