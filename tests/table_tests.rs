//! Table filtering and pagination tests
//!
//! Run with: cargo test --test table_tests

mod common;

use admin_session::session::{Role, User};
use admin_session::table::{filter_rows, paginate, TableQuery, TableRow};
use common::user;

fn directory() -> Vec<User> {
    let mut users = vec![
        user("u1", "Ada", "Lovelace"),
        user("u2", "Grace", "Hopper"),
        user("u3", "Alan", "Turing"),
        user("u4", "Edsger", "Dijkstra"),
        user("u5", "Barbara", "Liskov"),
    ];
    users[0].role = Role::SuperAdmin;
    users[1].role = Role::Admin;
    users[2].role = Role::Moderator;
    users[4].role = Role::Admin;
    users[1].is_email_verified = true;
    users[4].is_email_verified = true;
    users
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let users = directory();
    let query = TableQuery::default().with_search("LOVE");

    let rows = filter_rows(&users, &query);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "u1");
}

#[test]
fn test_search_matches_email() {
    let users = directory();
    let query = TableQuery::default().with_search("hopper@example");

    let rows = filter_rows(&users, &query);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_name, "Grace");
}

#[test]
fn test_blank_search_matches_everything() {
    let users = directory();
    let query = TableQuery::default().with_search("   ");

    assert_eq!(filter_rows(&users, &query).len(), users.len());
}

#[test]
fn test_role_filter() {
    let users = directory();
    let query = TableQuery::default().with_filter("role", "Admin");

    let ids: Vec<&str> = filter_rows(&users, &query)
        .iter()
        .map(|u| u.id.as_str())
        .collect();

    assert_eq!(ids, vec!["u2", "u5"]);
}

#[test]
fn test_filters_combine_with_search() {
    let users = directory();
    let query = TableQuery::default()
        .with_filter("role", "admin")
        .with_filter("verified", "true")
        .with_search("barbara");

    let rows = filter_rows(&users, &query);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "u5");
}

#[test]
fn test_unknown_field_matches_nothing() {
    let users = directory();
    let query = TableQuery::default().with_filter("department", "research");

    assert!(filter_rows(&users, &query).is_empty());
}

#[test]
fn test_apply_filters_then_paginates() {
    let users = directory();
    let query = TableQuery::default()
        .with_search("a")
        .with_page(2, 2);

    let page = query.apply(&users);

    // Every name in the directory contains an "a"
    assert_eq!(page.total_items, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "u3");
    assert!(page.has_previous());
    assert!(page.has_next());
}

#[test]
fn test_paginate_preserves_order() {
    let page = paginate(vec!["a", "b", "c", "d"], 1, 3);
    assert_eq!(page.items, vec!["a", "b", "c"]);
    assert_eq!(page.total_pages, 2);
}

#[test]
fn test_user_fields() {
    let users = directory();
    assert_eq!(users[0].field("role"), Some("super_admin".to_string()));
    assert_eq!(users[1].field("verified"), Some("true".to_string()));
    assert_eq!(users[2].field("nope"), None);
    assert!(users[3].search_text().contains("Dijkstra"));
}
