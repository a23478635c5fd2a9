#![cfg(feature = "inmem-store")]

use cirs::models::{NewComment, NewIssue, NewUser};
use cirs::repo::{inmem::InMemRepo, RepoError};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use cirs::repo::{CategoryRepo, CommentRepo, IssueRepo, UserRepo};
use cirs::routes::default_categories;
use serial_test::serial;

/// Helper that returns a fresh, empty repository for every test run.
fn repo() -> InMemRepo {
    // keep() detaches the directory from the guard so it survives this call
    let dir = tempfile::tempdir().unwrap().keep();
    std::env::set_var("CIRS_DATA_DIR", &dir);
    InMemRepo::new()
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Asha".into(),
        email: email.into(),
        password_hash: "a".repeat(64),
        phone: None,
        role: "citizen".into(),
    }
}

fn new_issue(category_id: i64, lat: f64, lng: f64) -> NewIssue {
    NewIssue {
        user_id: 1,
        category_id,
        title: "Pothole on 5th".into(),
        description: "Deep pothole near the crossing".into(),
        image_base64: None,
        voice_base64: None,
        location_lat: lat,
        location_long: lng,
        address: None,
    }
}

#[tokio::test]
#[serial]
async fn duplicate_email_conflicts_and_first_user_survives() {
    let r = repo();

    let first = r.create_user(new_user("asha@example.com")).await.unwrap();
    let err = r.create_user(new_user("asha@example.com")).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    // first record unaffected
    let found = r
        .find_user_by_credentials("asha@example.com", &"a".repeat(64))
        .await
        .unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.name, "Asha");
}

#[tokio::test]
#[serial]
async fn credentials_must_match_exactly() {
    let r = repo();
    r.create_user(new_user("asha@example.com")).await.unwrap();

    let err = r
        .find_user_by_credentials("asha@example.com", &"b".repeat(64))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn reseeding_categories_always_converges_to_seven() {
    let r = repo();

    let first = r.reset_categories(default_categories()).await.unwrap();
    assert_eq!(first.len(), 7);

    let second = r.reset_categories(default_categories()).await.unwrap();
    assert_eq!(second.len(), 7);
    assert_eq!(r.list_categories().await.unwrap().len(), 7);

    // same names, fresh identifiers
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.icon, b.icon);
        assert_ne!(a.id, b.id);
    }
    assert_eq!(second[0].name, "Roads & Transportation");
    assert_eq!(second[6].name, "Other");
}

#[tokio::test]
#[serial]
async fn category_listing_orders_by_votes_then_recency() {
    let r = repo();

    // A(votes=3, oldest), B(votes=3, newer), C(votes=1, newest)
    let a = r.create_issue(new_issue(1, 0.0, 0.0), None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let b = r.create_issue(new_issue(1, 0.0, 0.0), None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let c = r.create_issue(new_issue(1, 0.0, 0.0), None).await.unwrap();
    // different category, must never appear
    let other = r.create_issue(new_issue(2, 0.0, 0.0), None).await.unwrap();

    for _ in 0..3 {
        r.vote_issue(a.id).await.unwrap();
        r.vote_issue(b.id).await.unwrap();
    }
    r.vote_issue(c.id).await.unwrap();

    let listed = r.list_issues_by_category(1).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![b.id, a.id, c.id]);
    assert!(!ids.contains(&other.id));
}

#[tokio::test]
#[serial]
async fn votes_accumulate_and_unknown_ids_fail() {
    let r = repo();
    let issue = r.create_issue(new_issue(1, 0.0, 0.0), None).await.unwrap();
    assert_eq!(issue.vote_count, 0);
    assert_eq!(issue.status, cirs::models::STATUS_PENDING);

    for _ in 0..5 {
        r.vote_issue(issue.id).await.unwrap();
    }
    for _ in 0..3 {
        r.vote_issue(issue.id).await.unwrap();
    }
    let after = r.get_issue(issue.id).await.unwrap();
    assert_eq!(after.vote_count, 8);
    // voting never touches updated_at
    assert_eq!(after.updated_at, issue.updated_at);

    let err = r.vote_issue(9999).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn bounding_box_is_inclusive_and_axis_aligned() {
    let r = repo();
    let near = r.create_issue(new_issue(1, 10.03, 20.04), None).await.unwrap();
    let far = r.create_issue(new_issue(1, 10.10, 20.00), None).await.unwrap();

    let hits = r
        .list_issues_in_box(10.0 - 0.05, 10.0 + 0.05, 20.0 - 0.05, 20.0 + 0.05)
        .await
        .unwrap();
    let ids: Vec<_> = hits.iter().map(|i| i.id).collect();
    assert!(ids.contains(&near.id));
    assert!(!ids.contains(&far.id));
}

#[tokio::test]
#[serial]
async fn comments_require_an_existing_issue_and_list_newest_first() {
    let r = repo();
    let issue = r.create_issue(new_issue(1, 0.0, 0.0), None).await.unwrap();

    let err = r
        .create_comment(
            9999,
            NewComment {
                user_id: 1,
                message: "orphan".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));

    let first = r
        .create_comment(
            issue.id,
            NewComment {
                user_id: 1,
                message: "first".into(),
            },
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = r
        .create_comment(
            issue.id,
            NewComment {
                user_id: 2,
                message: "second".into(),
            },
        )
        .await
        .unwrap();

    let listed = r.list_comments(issue.id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
#[serial]
async fn snapshot_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("CIRS_DATA_DIR", dir.path());

    let r = InMemRepo::new();
    r.create_user(new_user("asha@example.com")).await.unwrap();
    let issue = r.create_issue(new_issue(1, 1.0, 2.0), None).await.unwrap();

    // a fresh instance over the same directory sees the same state
    let reloaded = InMemRepo::new();
    let logged_in = reloaded
        .find_user_by_credentials("asha@example.com", &"a".repeat(64))
        .await
        .unwrap();
    assert_eq!(logged_in.email, "asha@example.com");
    assert_eq!(reloaded.get_issue(issue.id).await.unwrap().title, issue.title);
}
