/// Tests for admin surface conventions
///
/// Note: These are unit tests that verify the logic is correct.
/// Database-backed workflow tests live next to the managers they cover.

#[cfg(test)]
mod tests {
    // Invite codes are 12 lowercase alphanumeric characters
    #[test]
    fn test_invite_code_shape() {
        use rand::{distributions::Alphanumeric, Rng};

        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();

        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(code.chars().all(|c| !c.is_uppercase()));
    }

    #[test]
    fn test_invite_codes_are_unique() {
        use rand::{distributions::Alphanumeric, Rng};
        use std::collections::HashSet;

        let mut codes = HashSet::new();
        for _ in 0..100 {
            let code: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect::<String>()
                .to_lowercase();
            codes.insert(code);
        }

        // 12 characters over a 36-symbol alphabet: collisions in 100
        // draws are astronomically unlikely
        assert_eq!(codes.len(), 100);
    }

    #[test]
    fn test_session_token_header_parsing() {
        let auth_header = "Bearer abc123token";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, Some("abc123token"));

        let invalid_header = "abc123token";
        let token = invalid_header.strip_prefix("Bearer ");
        assert_eq!(token, None);
    }

    #[test]
    fn test_session_cookie_parsing() {
        let cookie_header = "theme=dark; admin_session=tok42; lang=en";
        let token = cookie_header.split(';').find_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            (name == "admin_session").then(|| value.to_string())
        });
        assert_eq!(token.as_deref(), Some("tok42"));
    }

    #[test]
    fn test_audit_snapshot_shape() {
        // Snapshots are JSON objects keyed by the fields a transition moved
        let old_values = serde_json::json!({
            "is_banned": false,
            "banned_at": null,
            "ban_reason": null,
        });
        let new_values = serde_json::json!({
            "is_banned": true,
            "banned_at": "2026-01-01T00:00:00Z",
            "ban_reason": "Banned by admin",
        });

        assert!(old_values.is_object());
        assert_eq!(
            old_values.as_object().unwrap().keys().collect::<Vec<_>>(),
            new_values.as_object().unwrap().keys().collect::<Vec<_>>(),
        );
    }
}
