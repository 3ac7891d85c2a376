use usermgr_core::User;

#[test]
fn user_new_sets_defaults() {
    let user = User::new("Arslan", "a@x.com", 28);

    assert_eq!(user.id, None);
    assert_eq!(user.name, "Arslan");
    assert_eq!(user.email, "a@x.com");
    assert_eq!(user.age, 28);
    assert_eq!(user.created_at, None);
}

#[test]
fn user_serialization_uses_expected_wire_fields() {
    let mut user = User::new("Iba", "ibragim@mail.com", 35);
    user.id = Some(3);
    user.created_at = Some(1_700_000_000_000);

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["name"], "Iba");
    assert_eq!(json["email"], "ibragim@mail.com");
    assert_eq!(json["age"], 35);
    assert_eq!(json["created_at"], 1_700_000_000_000_i64);

    let decoded: User = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, user);
}

#[test]
fn unsaved_user_serializes_null_identity() {
    let json = serde_json::to_value(User::new("Arslan", "a@x.com", 28)).unwrap();
    assert!(json["id"].is_null());
    assert!(json["created_at"].is_null());
}
