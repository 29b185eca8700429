//! Eligibility selection
//!
//! Picks a random catalog item that has not been posted to the target platform
//! within the cooldown window. The search is a bounded random sample, not an
//! exhaustive scan: after `max_tries` ineligible draws the run gives up even if
//! an eligible item exists somewhere in the pool.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::{CatalogStore, MediaFilter};
use crate::error::PostingError;
use crate::types::{MediaItem, Platform};

/// Default number of random draws per run
pub const DEFAULT_MAX_TRIES: u32 = 5;

/// Cooldown rule for one platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownPolicy {
    pub platform: Platform,
    pub cooldown: Duration,
}

impl CooldownPolicy {
    pub fn new(platform: Platform, cooldown: Duration) -> Self {
        Self { platform, cooldown }
    }

    /// An item is eligible once strictly more than `cooldown` has elapsed
    pub fn is_eligible(&self, item: &MediaItem, now: f64) -> bool {
        now - item.last_post(self.platform) > self.cooldown.as_secs_f64()
    }
}

/// Outcome of [`select_candidate`]
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Eligible { item: MediaItem, attempts: u32 },
    /// Every draw hit an item inside its cooldown window
    Exhausted { attempts: u32 },
}

/// Draw up to `max_tries` random items and return the first eligible one
///
/// The candidate pool is loaded once with `filter`; draws are uniform and with
/// replacement.
///
/// # Errors
///
/// Returns [`PostingError::EmptyCandidatePool`] if nothing matches `filter`,
/// or [`PostingError::Catalog`] if the store cannot be read.
pub async fn select_candidate<R: Rng + ?Sized>(
    catalog: &dyn CatalogStore,
    filter: &MediaFilter,
    policy: &CooldownPolicy,
    max_tries: u32,
    now: f64,
    rng: &mut R,
) -> Result<Selection, PostingError> {
    let candidates = catalog.find(filter).await?;
    if candidates.is_empty() {
        return Err(PostingError::EmptyCandidatePool);
    }

    for attempt in 1..=max_tries {
        let candidate = match candidates.choose(rng) {
            Some(candidate) => candidate,
            None => return Err(PostingError::EmptyCandidatePool),
        };

        if policy.is_eligible(candidate, now) {
            info!(
                "Selected {:?} for {} after {} attempt(s)",
                candidate.filename, policy.platform, attempt
            );
            return Ok(Selection::Eligible {
                item: candidate.clone(),
                attempts: attempt,
            });
        }

        debug!(
            "Draw {}/{}: {:?} is still cooling down on {}",
            attempt, max_tries, candidate.filename, policy.platform
        );
    }

    info!(
        "No eligible media for {} after {} attempts",
        policy.platform, max_tries
    );
    Ok(Selection::Exhausted {
        attempts: max_tries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::types::MediaType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: f64 = 1_700_000_000.0;
    const WEEK: Duration = Duration::from_secs(7 * 86_400);

    fn item(filename: &str, last_ig_post: f64) -> MediaItem {
        let mut item = MediaItem::new(filename, format!("https://cdn.example.com/{}", filename));
        item.last_ig_post = last_ig_post;
        item
    }

    fn policy() -> CooldownPolicy {
        CooldownPolicy::new(Platform::Instagram, WEEK)
    }

    #[test]
    fn test_eligibility_boundary_is_strict() {
        let policy = policy();
        let week = WEEK.as_secs_f64();

        assert!(!policy.is_eligible(&item("a.jpg", NOW - week), NOW));
        assert!(policy.is_eligible(&item("a.jpg", NOW - week - 1.0), NOW));
        assert!(policy.is_eligible(&item("a.jpg", 0.0), NOW));
    }

    #[test]
    fn test_eligibility_is_per_platform() {
        let mut posted = item("a.jpg", NOW);
        posted.last_x_post = 0.0;

        assert!(!CooldownPolicy::new(Platform::Instagram, WEEK).is_eligible(&posted, NOW));
        assert!(CooldownPolicy::new(Platform::X, WEEK).is_eligible(&posted, NOW));
    }

    #[tokio::test]
    async fn test_empty_pool_is_an_error() {
        let catalog = MemoryCatalog::new(vec![]);
        let mut rng = StdRng::seed_from_u64(1);

        let result =
            select_candidate(&catalog, &MediaFilter::new(), &policy(), 5, NOW, &mut rng).await;

        assert!(matches!(result, Err(PostingError::EmptyCandidatePool)));
    }

    #[tokio::test]
    async fn test_type_filter_can_empty_the_pool() {
        let catalog = MemoryCatalog::new(vec![item("a.jpg", 0.0)]);
        let filter = MediaFilter::new().with_media_type(Some(MediaType::Video));
        let mut rng = StdRng::seed_from_u64(1);

        let result = select_candidate(&catalog, &filter, &policy(), 5, NOW, &mut rng).await;

        assert!(matches!(result, Err(PostingError::EmptyCandidatePool)));
    }

    #[tokio::test]
    async fn test_all_cooling_down_exhausts_after_max_tries() {
        let catalog = MemoryCatalog::new(vec![
            item("a.jpg", NOW - 10.0),
            item("b.jpg", NOW - 20.0),
            item("c.jpg", NOW - 30.0),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        for max_tries in [1, 5, 12] {
            let selection = select_candidate(
                &catalog,
                &MediaFilter::new(),
                &policy(),
                max_tries,
                NOW,
                &mut rng,
            )
            .await
            .unwrap();

            assert_eq!(selection, Selection::Exhausted { attempts: max_tries });
        }
    }

    #[tokio::test]
    async fn test_never_returns_item_inside_cooldown() {
        let catalog = MemoryCatalog::new(vec![
            item("fresh.jpg", 0.0),
            item("hot-1.jpg", NOW - 60.0),
            item("hot-2.jpg", NOW - 3_600.0),
            item("hot-3.jpg", NOW - WEEK.as_secs_f64()),
        ]);

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection =
                select_candidate(&catalog, &MediaFilter::new(), &policy(), 5, NOW, &mut rng)
                    .await
                    .unwrap();

            if let Selection::Eligible { item, attempts } = selection {
                assert_eq!(item.filename, "fresh.jpg");
                assert!(attempts >= 1 && attempts <= 5);
            }
        }
    }

    #[tokio::test]
    async fn test_first_eligible_draw_is_accepted() {
        let catalog = MemoryCatalog::new(vec![item("a.jpg", 0.0), item("b.jpg", 0.0)]);
        let mut rng = StdRng::seed_from_u64(3);

        let selection =
            select_candidate(&catalog, &MediaFilter::new(), &policy(), 5, NOW, &mut rng)
                .await
                .unwrap();

        match selection {
            Selection::Eligible { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("Expected an eligible item, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pool_is_loaded_once_per_selection() {
        let catalog = MemoryCatalog::new(vec![item("a.jpg", NOW)]);
        let mut rng = StdRng::seed_from_u64(3);

        select_candidate(&catalog, &MediaFilter::new(), &policy(), 5, NOW, &mut rng)
            .await
            .unwrap();

        assert_eq!(catalog.find_call_count(), 1);
    }
}
