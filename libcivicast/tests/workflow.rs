//! Integration tests for CivicastService
//!
//! Drives generation, curation and scheduling together against the
//! in-process provider and generator.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use libcivicast::error::{CivicastError, SchedulingError};
use libcivicast::generation::MockGenerator;
use libcivicast::provider::{MockProvider, PublishTiming};
use libcivicast::service::generation::GenerateParams;
use libcivicast::service::orchestrator::{PostUpdate, ScheduleRequest};
use libcivicast::service::{CivicastService, SessionScheduleOptions};
use libcivicast::{Config, Database, Platform, PostQuery, PostStatus};
use tempfile::TempDir;

async fn setup(provider: MockProvider, backend: MockGenerator) -> (CivicastService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("workflow.db");

    let mut config = Config::default_config();
    config.database.path = db_path.to_str().unwrap().to_string();
    let db = Database::new(&config.database.path).await.unwrap();

    let service =
        CivicastService::with_components(config, db, Arc::new(provider), Arc::new(backend));
    (service, temp_dir)
}

fn park_params(platforms: Vec<Platform>, per_platform: usize) -> GenerateParams {
    GenerateParams {
        title: Some("Park Opens".to_string()),
        content: Some("New playground opens Saturday".to_string()),
        platforms,
        posts_per_platform: Some(per_platform),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_five_twitter_variations_for_park_opening() {
    let (service, _tmp) = setup(MockProvider::success(), MockGenerator::well_formed()).await;

    let variations = service
        .generation()
        .generate(park_params(vec![Platform::Twitter], 5))
        .await
        .unwrap();

    assert_eq!(variations.len(), 5);
    assert!(variations.iter().all(|v| v.platform == Platform::Twitter));
    assert!(variations.iter().all(|v| v.text.chars().count() <= 280));
}

#[tokio::test]
async fn test_platform_angle_pairs_are_unique() {
    let (service, _tmp) = setup(MockProvider::success(), MockGenerator::well_formed()).await;

    let variations = service
        .generation()
        .generate(park_params(Platform::ALL.to_vec(), 5))
        .await
        .unwrap();

    let pairs: HashSet<(Platform, String)> = variations
        .iter()
        .map(|v| (v.platform, v.angle.to_lowercase()))
        .collect();
    assert_eq!(pairs.len(), variations.len());
}

#[tokio::test]
async fn test_malformed_reply_still_covers_every_platform() {
    let backend = MockGenerator::replying("Sorry, I can't produce JSON today.");
    let (service, _tmp) = setup(MockProvider::success(), backend).await;

    let variations = service
        .generation()
        .generate(park_params(Platform::ALL.to_vec(), 3))
        .await
        .unwrap();

    let covered: HashSet<Platform> = variations.iter().map(|v| v.platform).collect();
    assert_eq!(covered.len(), 4);
    assert!(variations.iter().all(|v| v.fits_platform()));
}

#[tokio::test]
async fn test_facebook_without_time_publishes_now() {
    let provider = MockProvider::success();
    let (service, _tmp) = setup(provider.clone(), MockGenerator::well_formed()).await;

    let post = service
        .orchestrator()
        .schedule_post(ScheduleRequest::new(
            Platform::Facebook,
            "The splash pad is open all weekend.",
        ))
        .await
        .unwrap();

    assert_eq!(post.status, PostStatus::Published);
    assert!(post.published_at.is_some());
    let creates = provider.create_calls();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].timing, PublishTiming::Now);
    assert_eq!(creates[0].platform, Platform::Facebook);
}

#[tokio::test]
async fn test_future_time_is_scheduled_and_listed() {
    let (service, _tmp) = setup(MockProvider::success(), MockGenerator::well_formed()).await;
    let at = Utc::now() + Duration::days(2);

    let post = service
        .orchestrator()
        .schedule_post(ScheduleRequest {
            scheduled_for: Some(at),
            ..ScheduleRequest::new(Platform::Linkedin, "Join the budget town hall.")
        })
        .await
        .unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);

    let page = service
        .history()
        .list(PostQuery {
            statuses: vec![PostStatus::Scheduled],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.posts[0].id, post.id);
}

#[tokio::test]
async fn test_published_post_is_immutable() {
    let provider = MockProvider::success();
    let (service, _tmp) = setup(provider.clone(), MockGenerator::well_formed()).await;

    let post = service
        .orchestrator()
        .schedule_post(ScheduleRequest::new(Platform::Twitter, "Live now"))
        .await
        .unwrap();
    let calls_before = provider.calls();

    let update = service
        .orchestrator()
        .update(
            &post.id,
            PostUpdate {
                content: Some("Changed".to_string()),
                ..Default::default()
            },
        )
        .await;
    let delete = service.orchestrator().delete(&post.id).await;

    assert!(matches!(update, Err(CivicastError::Immutable(_))));
    assert!(matches!(delete, Err(CivicastError::Immutable(_))));
    assert_eq!(provider.calls(), calls_before);
    assert_eq!(service.history().get(&post.id).await.unwrap(), post);
}

#[tokio::test]
async fn test_batch_with_one_missing_account() {
    let provider = MockProvider::with_accounts(&[Platform::Twitter, Platform::Facebook, Platform::Linkedin]);
    let (service, _tmp) = setup(provider, MockGenerator::well_formed()).await;

    let requests = vec![
        ScheduleRequest::new(Platform::Twitter, "one"),
        ScheduleRequest::new(Platform::Facebook, "two"),
        ScheduleRequest::new(Platform::Instagram, "three"),
        ScheduleRequest::new(Platform::Linkedin, "four"),
        ScheduleRequest::new(Platform::Twitter, "five"),
    ];
    let summary = service.orchestrator().schedule_batch(requests).await;

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[2].platform, Platform::Instagram);
    assert!(summary.results[2].error.as_deref().unwrap().contains("instagram"));

    let page = service.history().list(PostQuery::default()).await.unwrap();
    assert_eq!(page.total, 4);
}

#[tokio::test]
async fn test_platform_aliases_resolve_to_one_identifier() {
    let provider = MockProvider::success();
    let (service, _tmp) = setup(provider.clone(), MockGenerator::well_formed()).await;

    for name in ["X", "x", "twitter"] {
        let platform: Platform = name.parse().unwrap();
        service
            .orchestrator()
            .schedule_post(ScheduleRequest::new(platform, format!("via {}", name)))
            .await
            .unwrap();
    }

    let creates = provider.create_calls();
    assert_eq!(creates.len(), 3);
    assert!(creates.iter().all(|c| c.platform.as_str() == "twitter"));
    assert!(creates.iter().all(|c| c.account_id == "acc_twitter"));
}

#[tokio::test]
async fn test_curation_generate_more_and_schedule() {
    let provider = MockProvider::success();
    let (service, _tmp) = setup(provider.clone(), MockGenerator::well_formed()).await;

    let mut session = service
        .generation()
        .start_session(park_params(vec![Platform::Twitter], 2))
        .await
        .unwrap();
    let first = session.entries.clone();

    service
        .generation()
        .generate_more(&mut session, Some(2), None)
        .await
        .unwrap();
    assert_eq!(session.len(), 4);
    assert_eq!(&session.entries[..2], &first[..]);

    assert!(session.toggle_select(3).unwrap());
    let at = Utc::now() + Duration::hours(6);
    let summary = service
        .schedule_session(
            &mut session,
            SessionScheduleOptions {
                scheduled_for: Some(at),
                article_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    let post = summary.results[0].post.as_ref().unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);
    assert_eq!(post.content, session.entries[3].variation.text);
    assert_eq!(session.entries[3].post_id.as_deref(), Some(post.id.as_str()));
    assert_eq!(provider.create_calls()[0].timing, PublishTiming::At(at));
}

#[tokio::test]
async fn test_missing_api_key_fails_with_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default_config();
    config.database.path = temp_dir.path().join("keys.db").to_str().unwrap().to_string();
    config.scheduling.api_key_env = "CIVICAST_TEST_KEY_THAT_IS_NEVER_SET".to_string();

    let err = match CivicastService::from_config(config).await {
        Ok(_) => panic!("expected a missing key error"),
        Err(e) => e,
    };
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_account_missing_error_kind() {
    let (service, _tmp) = setup(MockProvider::with_accounts(&[]), MockGenerator::well_formed()).await;
    let err = service
        .orchestrator()
        .schedule_post(ScheduleRequest::new(Platform::Facebook, "hello"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CivicastError::Scheduling(SchedulingError::AccountMissing(_))
    ));
}
