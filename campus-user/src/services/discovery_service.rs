use std::collections::HashSet;

use uuid::Uuid;

use crate::models::Profile;

/// Identifiers hidden from a viewer's discovery feed: the viewer, everyone
/// the viewer already liked or passed on, and blocks in both directions.
pub fn exclusion_set(
    viewer: Uuid,
    liked: &[Uuid],
    passed: &[Uuid],
    blocked: &[Uuid],
    blocked_by: &[Uuid],
) -> HashSet<Uuid> {
    let mut set = HashSet::with_capacity(1 + liked.len() + passed.len() + blocked.len() + blocked_by.len());
    set.insert(viewer);
    set.extend(liked.iter().copied());
    set.extend(passed.iter().copied());
    set.extend(blocked.iter().copied());
    set.extend(blocked_by.iter().copied());
    set
}

/// Gender shown to a viewer; the feed mirrors the viewer's declared gender
/// with its opposite.
pub fn target_gender(viewer_gender: &str) -> &'static str {
    if viewer_gender.eq_ignore_ascii_case("male") {
        "female"
    } else {
        "male"
    }
}

/// Minimum completeness a profile needs before it may appear as a discovery
/// candidate: a non-empty display name and at least one photo.
pub fn is_candidate(profile: &Profile) -> bool {
    let named = profile
        .display_name
        .as_deref()
        .map(|n| !n.trim().is_empty())
        .unwrap_or(false);

    named && !profile.photos().is_empty() && profile.is_visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(display_name: Option<&str>, photos: Vec<&str>, visible: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            display_name: display_name.map(|s| s.to_string()),
            bio: None,
            age: Some(21),
            university: Some("State".into()),
            course: None,
            location: None,
            gender: Some("female".into()),
            photo_urls: serde_json::json!(photos),
            interests: serde_json::json!([]),
            verified_student: false,
            is_visible: visible,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exclusion_always_contains_viewer() {
        let viewer = Uuid::new_v4();
        let set = exclusion_set(viewer, &[], &[], &[], &[]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&viewer));
    }

    #[test]
    fn exclusion_collapses_duplicates() {
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();
        // liked and blocked the same user, and they blocked back
        let set = exclusion_set(viewer, &[other], &[], &[other], &[other]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&other));
    }

    #[test]
    fn exclusion_covers_blocks_both_directions() {
        let viewer = Uuid::new_v4();
        let i_blocked = Uuid::new_v4();
        let blocked_me = Uuid::new_v4();
        let set = exclusion_set(viewer, &[], &[], &[i_blocked], &[blocked_me]);
        assert!(set.contains(&i_blocked));
        assert!(set.contains(&blocked_me));
    }

    #[test]
    fn passed_profiles_are_excluded() {
        let viewer = Uuid::new_v4();
        let passed = Uuid::new_v4();
        let set = exclusion_set(viewer, &[], &[passed], &[], &[]);
        assert!(set.contains(&passed));
    }

    #[test]
    fn incomplete_profiles_are_not_candidates() {
        assert!(!is_candidate(&profile(None, vec!["a.jpg"], true)));
        assert!(!is_candidate(&profile(Some(""), vec!["a.jpg"], true)));
        assert!(!is_candidate(&profile(Some("  "), vec!["a.jpg"], true)));
        assert!(!is_candidate(&profile(Some("Sam"), vec![], true)));
        assert!(!is_candidate(&profile(Some("Sam"), vec!["a.jpg"], false)));
        assert!(is_candidate(&profile(Some("Sam"), vec!["a.jpg"], true)));
    }

    #[test]
    fn target_gender_is_opposite() {
        assert_eq!(target_gender("male"), "female");
        assert_eq!(target_gender("Male"), "female");
        assert_eq!(target_gender("female"), "male");
    }
}
