//! Concurrency coverage for etag-guarded writes.
//!
//! Concurrent writers holding the same etag race through the service and the
//! repository; exactly one may win and the loser must leave no trace.

use std::sync::Arc;

use entity_backend::domain::crud::{CrudService, Etag};
use entity_backend::domain::ports::{EntityRepository, EntityRepositoryError};
use entity_backend::domain::{ETAG_KEY, RequestContext};
use entity_backend::outbound::memory::InMemoryRepository;
use entity_backend::test_support::{Contact, ContactFlow, contact_registry, fixture_clock};
use rstest::{fixture, rstest};

#[fixture]
fn repo() -> Arc<InMemoryRepository<Contact>> {
    Arc::new(InMemoryRepository::with_records([
        Contact::new("c1", "Ada", 36).with_etag("e1"),
    ]))
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_repository_writes_with_one_etag_admit_one_winner(
    repo: Arc<InMemoryRepository<Contact>>,
) {
    let writers: Vec<_> = (0..8)
        .map(|n| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                let edited =
                    Contact::new("c1", format!("Writer {n}"), 36).with_etag(format!("w{n}"));
                repo.update(&RequestContext::new(), &edited, &Etag::from("e1"))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for writer in writers {
        match writer.await.expect("writer task should not panic") {
            Ok(_) => winners += 1,
            Err(EntityRepositoryError::EtagConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected repository error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    let stored = repo.snapshot("c1").expect("record survives");
    assert!(stored.name.starts_with("Writer "));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_service_updates_report_one_etag_rejection(
    repo: Arc<InMemoryRepository<Contact>>,
) {
    let service = CrudService::new(
        contact_registry().expect("contact catalogue should build"),
        Arc::clone(&repo),
        Arc::new(ContactFlow),
        fixture_clock(),
    )
    .expect("contact entity should be registered");

    let first = {
        let service = service.clone();
        tokio::spawn(async move {
            let edited = Contact::new("c1", "First", 36).with_etag("e1");
            service.update(&RequestContext::new(), edited).await
        })
    };
    let second = {
        let service = service.clone();
        tokio::spawn(async move {
            let edited = Contact::new("c1", "Second", 36).with_etag("e1");
            service.update(&RequestContext::new(), edited).await
        })
    };

    let outcomes = [
        first.await.expect("task should not panic").expect("no unexpected error"),
        second.await.expect("task should not panic").expect("no unexpected error"),
    ];
    let successes = outcomes.iter().filter(|outcome| outcome.is_success()).count();
    assert_eq!(successes, 1);

    let rejected = outcomes
        .iter()
        .find(|outcome| !outcome.is_success())
        .and_then(|outcome| outcome.validation_errors())
        .expect("loser should carry validation errors");
    assert!(rejected.contains_key(ETAG_KEY));

    let stored = repo.snapshot("c1").expect("record survives");
    let winner = outcomes
        .iter()
        .find_map(|outcome| outcome.data())
        .expect("winner returns the stored record");
    assert_eq!(stored, *winner);
    assert_ne!(stored.etag, Some(Etag::from("e1")));
}

#[rstest]
#[tokio::test]
async fn stale_etag_leaves_stored_record_untouched(repo: Arc<InMemoryRepository<Contact>>) {
    let before = repo.snapshot("c1");
    let edited = Contact::new("c1", "Mallory", 99).with_etag("e9");

    let err = repo
        .update(&RequestContext::new(), &edited, &Etag::from("e0"))
        .await
        .expect_err("stale etag should conflict");

    assert_eq!(err, EntityRepositoryError::etag_conflict("c1"));
    assert_eq!(repo.snapshot("c1"), before);
}
