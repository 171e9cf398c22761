use astro_core::body::{BodyType, CelestialBodyPatch, NewCelestialBody, SpectralClass};
use astro_core::query::BodyFilter;
use astro_core::{AppError, Fetch, Page, Sort, SortOrder};

use crate::integration::common::setup_test_db;

fn star(name: &str, distance: f64) -> NewCelestialBody {
    let mut body = NewCelestialBody::new(name, BodyType::Star);
    body.distance_from_earth = Some(distance);
    body
}

#[tokio::test]
async fn create_and_get_body() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let mut sun = star("Sun", 0.0);
    sun.spectral_class = Some(SpectralClass::G);
    let created = repo.create(&sun).await.unwrap();

    assert!(created.body.id > 0);
    assert_eq!(created.body.name, "Sun");
    assert_eq!(created.body.spectral_class, Some(SpectralClass::G));
    assert_eq!(created.children_count, Some(0));
    assert_eq!(created.observation_count, Some(0));

    let fetched = repo.get(created.body.id, Fetch::Bare).await.unwrap().unwrap();
    assert_eq!(fetched.body, created.body);
    assert!(fetched.children_count.is_none());
}

#[tokio::test]
async fn duplicate_name_is_conflict() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let mars = NewCelestialBody::new("Mars", BodyType::Planet);
    repo.create(&mars).await.unwrap();
    let err = repo.create(&mars).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let all = repo
        .list(&BodyFilter::default(), None, Page::default(), Fetch::Bare)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn missing_parent_is_not_found() {
    let (db, _container) = setup_test_db().await;
    let mut moon = NewCelestialBody::new("Moon", BodyType::Planet);
    moon.parent_id = Some(999);

    let err = db.body_repo().create(&moon).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn children_and_parent_name() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let sun = repo.create(&star("Sun", 0.0)).await.unwrap();
    for name in ["Mercury", "Venus"] {
        let mut planet = NewCelestialBody::new(name, BodyType::Planet);
        planet.parent_id = Some(sun.body.id);
        repo.create(&planet).await.unwrap();
    }

    let children = repo
        .children(sun.body.id, Fetch::WithRelated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.parent_name.as_deref() == Some("Sun")));

    let sun = repo.get(sun.body.id, Fetch::WithRelated).await.unwrap().unwrap();
    assert_eq!(sun.children_count, Some(2));

    let lonely = repo.create(&star("Proxima", 4.2)).await.unwrap();
    let none = repo.children(lonely.body.id, Fetch::Bare).await.unwrap();
    assert_eq!(none, Some(vec![]));
    assert!(repo.children(12345, Fetch::Bare).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_parent_detaches_children() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let sun = repo.create(&star("Sun", 0.0)).await.unwrap();
    let mut earth = NewCelestialBody::new("Earth", BodyType::Planet);
    earth.parent_id = Some(sun.body.id);
    let earth = repo.create(&earth).await.unwrap();

    assert!(repo.delete(sun.body.id).await.unwrap());
    assert!(!repo.delete(sun.body.id).await.unwrap());
    assert!(repo.get(sun.body.id, Fetch::Bare).await.unwrap().is_none());

    let earth = repo.get(earth.body.id, Fetch::Bare).await.unwrap().unwrap();
    assert_eq!(earth.body.parent_id, None);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let mut sirius = star("Sirius", 8.6);
    sirius.temperature = Some(9940.0);
    let sirius = repo.create(&sirius).await.unwrap();

    let patch = CelestialBodyPatch {
        spectral_class: Some(Some(SpectralClass::A)),
        ..Default::default()
    };
    let updated = repo.update(sirius.body.id, &patch).await.unwrap();

    assert_eq!(updated.body.spectral_class, Some(SpectralClass::A));
    assert_eq!(updated.body.temperature, Some(9940.0));
    assert_eq!(updated.body.distance_from_earth, Some(8.6));
    assert!(updated.body.updated_at >= sirius.body.updated_at);
}

#[tokio::test]
async fn update_rejects_classified_non_star() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let mut vega = star("Vega", 25.0);
    vega.spectral_class = Some(SpectralClass::A);
    let vega = repo.create(&vega).await.unwrap();

    let patch = CelestialBodyPatch {
        body_type: Some(BodyType::Planet),
        ..Default::default()
    };
    let err = repo.update(vega.body.id, &patch).await.unwrap_err();
    match err {
        AppError::ValidationError(errors) => assert!(errors.has("spectral_class")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn update_rejects_parent_cycles() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let galaxy = repo
        .create(&NewCelestialBody::new("Milky Way", BodyType::Galaxy))
        .await
        .unwrap();
    let mut sun = star("Sun", 0.0);
    sun.parent_id = Some(galaxy.body.id);
    let sun = repo.create(&sun).await.unwrap();
    let mut earth = NewCelestialBody::new("Earth", BodyType::Planet);
    earth.parent_id = Some(sun.body.id);
    let earth = repo.create(&earth).await.unwrap();

    // Galaxy -> Sun -> Earth; making Earth the galaxy's parent closes the loop.
    let patch = CelestialBodyPatch {
        parent_id: Some(Some(earth.body.id)),
        ..Default::default()
    };
    let err = repo.update(galaxy.body.id, &patch).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let self_parent = CelestialBodyPatch {
        parent_id: Some(Some(sun.body.id)),
        ..Default::default()
    };
    assert!(repo.update(sun.body.id, &self_parent).await.is_err());

    let missing = CelestialBodyPatch {
        parent_id: Some(Some(9999)),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(earth.body.id, &missing).await.unwrap_err(),
        AppError::NotFound(_)
    ));

    assert!(matches!(
        repo.update(9999, &CelestialBodyPatch::default()).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn rename_to_taken_name_is_conflict() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    repo.create(&NewCelestialBody::new("Mars", BodyType::Planet))
        .await
        .unwrap();
    let venus = repo
        .create(&NewCelestialBody::new("Venus", BodyType::Planet))
        .await
        .unwrap();

    let patch = CelestialBodyPatch {
        name: Some("Mars".into()),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(venus.body.id, &patch).await.unwrap_err(),
        AppError::Conflict(_)
    ));

    // Re-sending the current name is not a conflict.
    let same = CelestialBodyPatch {
        name: Some("Venus".into()),
        ..Default::default()
    };
    assert!(repo.update(venus.body.id, &same).await.is_ok());
}

#[tokio::test]
async fn search_filters_and_sorting() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    for (name, distance) in [("Alpha Centauri A", 4.37), ("Sirius", 8.6), ("Betelgeuse", 548.0)] {
        repo.create(&star(name, distance)).await.unwrap();
    }
    repo.create(&NewCelestialBody::new("Jupiter", BodyType::Planet))
        .await
        .unwrap();

    let near = BodyFilter {
        body_type: Some(BodyType::Star),
        max_distance: Some(10.0),
        ..Default::default()
    };
    let sort = Sort {
        field: "distance_from_earth".into(),
        order: SortOrder::Desc,
    };
    let found = repo
        .list(&near, Some(&sort), Page::default(), Fetch::Bare)
        .await
        .unwrap();
    let names: Vec<_> = found.iter().map(|b| b.body.name.as_str()).collect();
    assert_eq!(names, ["Sirius", "Alpha Centauri A"]);

    let by_name = BodyFilter {
        name: Some("CENTAURI".into()),
        ..Default::default()
    };
    let found = repo
        .list(&by_name, None, Page::default(), Fetch::Bare)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let wildcard = BodyFilter {
        name: Some("%".into()),
        ..Default::default()
    };
    assert!(
        repo.list(&wildcard, None, Page::default(), Fetch::Bare)
            .await
            .unwrap()
            .is_empty()
    );

    let inverted = BodyFilter {
        min_distance: Some(10.0),
        max_distance: Some(5.0),
        ..Default::default()
    };
    assert!(
        repo.list(&inverted, None, Page::default(), Fetch::Bare)
            .await
            .unwrap()
            .is_empty()
    );

    let second_page = repo
        .list(
            &BodyFilter::default(),
            None,
            Page { skip: 3, limit: 10 },
            Fetch::Bare,
        )
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].body.name, "Jupiter");
}

#[tokio::test]
async fn statistics_on_empty_and_populated_catalog() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    let empty = repo.statistics().await.unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.by_type.is_empty());
    assert!(empty.distance_statistics.average.is_none());

    repo.create(&star("Sirius", 8.0)).await.unwrap();
    repo.create(&star("Vega", 24.0)).await.unwrap();
    repo.create(&NewCelestialBody::new("Mars", BodyType::Planet))
        .await
        .unwrap();

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_type.get("star"), Some(&2));
    assert_eq!(stats.by_type.get("planet"), Some(&1));
    assert_eq!(stats.distance_statistics.average, Some(16.0));
    assert_eq!(stats.distance_statistics.minimum, Some(8.0));
    assert_eq!(stats.distance_statistics.maximum, Some(24.0));
}

#[tokio::test]
async fn batch_skips_existing_and_repeated_names() {
    let (db, _container) = setup_test_db().await;
    let repo = db.body_repo();

    repo.create(&NewCelestialBody::new("Mars", BodyType::Planet))
        .await
        .unwrap();

    let batch = vec![
        NewCelestialBody::new("Mars", BodyType::Planet),
        NewCelestialBody::new("Ceres", BodyType::Asteroid),
        NewCelestialBody::new("Ceres", BodyType::Asteroid),
        NewCelestialBody::new("Halley", BodyType::Comet),
    ];
    let created = repo.create_many(&batch).await.unwrap();
    let names: Vec<_> = created.iter().map(|b| b.body.name.as_str()).collect();
    assert_eq!(names, ["Ceres", "Halley"]);
}
