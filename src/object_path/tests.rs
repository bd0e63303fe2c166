use super::{is_valid_object_path, ROOT};

#[test]
fn valid_paths() {
    assert!(is_valid_object_path(ROOT));
    assert!(is_valid_object_path("/a"));
    assert!(is_valid_object_path("/org/freedesktop/Notifications"));
    assert!(is_valid_object_path("/_0/A_b"));
}

#[test]
fn invalid_paths() {
    assert!(!is_valid_object_path(""));
    assert!(!is_valid_object_path("a"));
    assert!(!is_valid_object_path("//"));
    assert!(!is_valid_object_path("/a//b"));
    assert!(!is_valid_object_path("/a/"));
    assert!(!is_valid_object_path("/a-b"));
    assert!(!is_valid_object_path("/a.b"));
    assert!(!is_valid_object_path("/ä"));
}
