//! Element-resolution contract tests
//!
//! Exercises the label-matching heuristics through the public API with
//! descriptors shaped like real scraped pages.

use pretty_assertions::assert_eq;
use webpilot::resolve::label::{select_field, FieldDescriptor};
use webpilot::resolve::default_matchers;

fn descriptor(index: usize) -> FieldDescriptor {
    FieldDescriptor {
        index,
        tag: "input".to_string(),
        input_type: String::new(),
        placeholder: String::new(),
        name: String::new(),
        id: String::new(),
        aria_label: String::new(),
        label: String::new(),
    }
}

#[test]
fn test_login_form_field_selection() {
    // A typical login form: both fields mention "pass"/"user" in several
    // attributes; the type-preference matchers must pick the right one.
    let mut username = descriptor(0);
    username.input_type = "text".to_string();
    username.name = "user_name".to_string();
    username.placeholder = "Username or email".to_string();

    let mut password = descriptor(1);
    password.input_type = "password".to_string();
    password.name = "user_pass".to_string();
    password.label = "Password".to_string();

    let candidates = vec![username, password];
    let matchers = default_matchers();

    let field = select_field("password", &candidates, &matchers).unwrap();
    assert_eq!(field.index, 1);

    let field = select_field("username", &candidates, &matchers).unwrap();
    assert_eq!(field.index, 0);
}

#[test]
fn test_password_preference_beats_document_order() {
    // The text input named "pass" comes first in document order but must
    // lose to the password-typed input with the same name.
    let mut decoy = descriptor(0);
    decoy.input_type = "text".to_string();
    decoy.name = "pass".to_string();

    let mut real = descriptor(1);
    real.input_type = "password".to_string();
    real.name = "pass".to_string();

    let candidates = vec![decoy, real];
    let matchers = default_matchers();
    let field = select_field("password", &candidates, &matchers).unwrap();
    assert_eq!(field.index, 1);
}

#[test]
fn test_search_label_takes_first_match() {
    let mut header_search = descriptor(0);
    header_search.aria_label = "Search".to_string();

    let mut footer_search = descriptor(1);
    footer_search.placeholder = "Search the docs".to_string();

    let candidates = vec![header_search, footer_search];
    let matchers = default_matchers();
    let field = select_field("search", &candidates, &matchers).unwrap();
    assert_eq!(field.index, 0);
}

#[test]
fn test_no_candidate_yields_none() {
    let mut city = descriptor(0);
    city.name = "city".to_string();

    let matchers = default_matchers();
    assert!(select_field("credit card", &[city], &matchers).is_none());
}
