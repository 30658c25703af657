use std::collections::BTreeMap;

/// Builds the object-store key `player_photos/<season>/<team>/<age>/<player>.jpg`
/// (spec §4.8 step 4c). Non-alphanumeric characters in the player name are
/// collapsed to underscores so the key is a safe path segment.
pub fn object_store_key(season: &str, team: &str, age_group: &str, player_name: &str) -> String {
    let safe_player: String = player_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("player_photos/{season}/{team}/{age_group}/{safe_player}.jpg")
}

pub fn photo_metadata(
    player_name: &str,
    team: &str,
    age_group: &str,
    original_extension: &str,
    optimization_summary: &str,
) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    meta.insert("player_name".to_string(), player_name.to_string());
    meta.insert("team".to_string(), team.to_string());
    meta.insert("age_group".to_string(), age_group.to_string());
    meta.insert("original_extension".to_string(), original_extension.to_string());
    meta.insert("optimization_summary".to_string(), optimization_summary.to_string());
    meta.insert("uploaded_at".to_string(), chrono::Utc::now().to_rfc3339());
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lowercases_and_strips_spaces() {
        let key = object_store_key("2526", "Lions", "U10", "Alice Smith");
        assert_eq!(key, "player_photos/2526/Lions/U10/alice_smith.jpg");
    }
}
