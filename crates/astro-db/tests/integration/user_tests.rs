use astro_core::AppError;
use astro_core::user::{UserPatch, UserRecord};

use crate::integration::common::setup_test_db;

fn record(username: &str, email: &str) -> UserRecord {
    UserRecord {
        username: username.into(),
        email: email.into(),
        hashed_password: "$argon2id$placeholder".into(),
        full_name: None,
        is_superuser: false,
    }
}

#[tokio::test]
async fn create_and_lookup() {
    let (db, _container) = setup_test_db().await;
    let repo = db.user_repo();

    let user = repo.create(&record("ann", "ann@x.com")).await.unwrap();
    assert!(user.is_active);
    assert!(!user.is_superuser);
    assert!(user.last_login.is_none());

    assert_eq!(repo.get_by_username("ann").await.unwrap().unwrap().id, user.id);
    assert_eq!(repo.get_by_id(user.id).await.unwrap().unwrap().username, "ann");
    assert_eq!(repo.find_for_login("ANN@x.com").await.unwrap().unwrap().id, user.id);
    assert!(repo.find_for_login("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_or_email_is_conflict() {
    let (db, _container) = setup_test_db().await;
    let repo = db.user_repo();

    repo.create(&record("ann", "ann@x.com")).await.unwrap();
    for duplicate in [record("ann", "other@x.com"), record("bob", "ann@x.com")] {
        let err = repo.create(&duplicate).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}

#[tokio::test]
async fn profile_update_and_password() {
    let (db, _container) = setup_test_db().await;
    let repo = db.user_repo();

    let ann = repo.create(&record("ann", "ann@x.com")).await.unwrap();
    repo.create(&record("bob", "bob@x.com")).await.unwrap();

    let patch = UserPatch {
        full_name: Some(Some("Ann Smith".into())),
        bio: Some(Some("Comet hunter".into())),
        ..Default::default()
    };
    let updated = repo.update_profile(ann.id, &patch).await.unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Ann Smith"));
    assert_eq!(updated.email, "ann@x.com");

    let steal = UserPatch {
        email: Some("BOB@x.com".into()),
        ..Default::default()
    };
    assert!(matches!(
        repo.update_profile(ann.id, &steal).await.unwrap_err(),
        AppError::Conflict(_)
    ));

    repo.set_password(ann.id, "new-hash").await.unwrap();
    repo.touch_last_login(ann.id).await.unwrap();
    let ann = repo.get_by_id(ann.id).await.unwrap().unwrap();
    assert_eq!(ann.hashed_password, "new-hash");
    assert!(ann.last_login.is_some());
}

#[tokio::test]
async fn set_active_toggles_account() {
    let (db, _container) = setup_test_db().await;
    let repo = db.user_repo();

    repo.create(&record("ann", "ann@x.com")).await.unwrap();
    assert!(repo.set_active("ann", false).await.unwrap());
    assert!(!repo.get_by_username("ann").await.unwrap().unwrap().is_active);
    assert!(!repo.set_active("nobody", true).await.unwrap());
}
