//! Tests for core domain types.

use super::*;

#[test]
fn test_user_login_rejects_empty() {
    let result = UserLogin::new("");

    assert_eq!(
        result,
        Err(ValidationError::Required {
            field: "login".to_string()
        })
    );
}

#[test]
fn test_user_login_keeps_value_verbatim() {
    let login = UserLogin::new("Alice Smith").unwrap();

    assert_eq!(login.as_str(), "Alice Smith");
    assert_eq!(login.to_string(), "Alice Smith");
}

#[test]
fn test_task_id_parses_unsigned_integers_only() {
    assert_eq!("42".parse::<TaskId>().unwrap(), TaskId::new(42));
    assert!("-1".parse::<TaskId>().is_err());
    assert!("forty-two".parse::<TaskId>().is_err());
}

#[test]
fn test_routing_keys_are_case_sensitive() {
    assert_eq!(EventKind::from_routing_key("Like"), Some(EventKind::Like));
    assert_eq!(EventKind::from_routing_key("View"), Some(EventKind::View));
    assert_eq!(EventKind::from_routing_key("like"), None);
    assert_eq!(EventKind::from_routing_key("Share"), None);
    assert_eq!(EventKind::from_routing_key(""), None);
}

#[test]
fn test_event_kind_storage_names_round_trip() {
    for kind in EventKind::ALL {
        assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        assert_eq!(EventKind::from_routing_key(kind.routing_key()), Some(kind));
    }
}

#[test]
fn test_event_kind_serializes_lowercase() {
    let json = serde_json::to_string(&EventKind::View).unwrap();

    assert_eq!(json, "\"view\"");
}
