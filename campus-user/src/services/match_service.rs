use uuid::Uuid;

/// Canonical ordering for the unordered pair (a, b): smaller uuid first.
/// Both sides of a mutual like compute the same (user_a, user_b), so the
/// unique constraint on the match row sees one key regardless of which
/// client completed the pair.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn smaller_uuid_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = canonical_pair(a, b);
        assert!(first < second);
    }

    #[test]
    fn pair_members_preserved() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = canonical_pair(a, b);
        assert!((first == a && second == b) || (first == b && second == a));
    }
}
