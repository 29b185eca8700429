//! Group expansion for multi-item posts

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

use crate::catalog::{CatalogStore, MediaFilter};
use crate::error::PostingError;
use crate::selection::CooldownPolicy;
use crate::types::{MediaItem, MediaType};

/// Collect the seed's eligible group-mates
///
/// One group is drawn uniformly from `seed.group_list`. Its other members that
/// match `media_type` and are outside their cooldown window are shuffled and
/// returned after the seed, so element 0 is always the seed. Callers take a
/// bounded prefix of the result.
///
/// # Errors
///
/// Returns [`PostingError::NoGroup`] when the seed belongs to no group. This
/// only means a group post is impossible; the seed can still be posted alone.
pub async fn expand_group<R: Rng + ?Sized>(
    catalog: &dyn CatalogStore,
    seed: &MediaItem,
    policy: &CooldownPolicy,
    media_type: Option<MediaType>,
    now: f64,
    rng: &mut R,
) -> Result<Vec<MediaItem>, PostingError> {
    let group = seed
        .group_list
        .iter()
        .choose(rng)
        .ok_or_else(|| PostingError::NoGroup(seed.filename.clone()))?;

    let filter = MediaFilter::new()
        .with_media_type(media_type)
        .in_group(group.as_str())
        .excluding(seed.filename.as_str());

    let mut mates: Vec<MediaItem> = catalog
        .find(&filter)
        .await?
        .into_iter()
        .filter(|item| item.filename != seed.filename && policy.is_eligible(item, now))
        .collect();

    debug!(
        "Group {:?} of {:?} has {} eligible companion(s)",
        group,
        seed.filename,
        mates.len()
    );

    mates.shuffle(rng);

    let mut members = Vec::with_capacity(mates.len() + 1);
    members.push(seed.clone());
    members.append(&mut mates);
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::types::Platform;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use std::time::Duration;

    const NOW: f64 = 1_700_000_000.0;

    fn item(filename: &str, groups: &[&str], last_x_post: f64) -> MediaItem {
        let mut item = MediaItem::new(filename, format!("https://cdn.example.com/{}", filename));
        item.group_list = groups.iter().map(|g| g.to_string()).collect();
        item.last_x_post = last_x_post;
        item
    }

    fn policy() -> CooldownPolicy {
        CooldownPolicy::new(Platform::X, Duration::from_secs(86_400))
    }

    #[tokio::test]
    async fn test_no_group_is_reported() {
        let seed = item("seed.jpg", &[], 0.0);
        let catalog = MemoryCatalog::new(vec![seed.clone()]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = expand_group(&catalog, &seed, &policy(), None, NOW, &mut rng).await;

        match result {
            Err(PostingError::NoGroup(filename)) => assert_eq!(filename, "seed.jpg"),
            other => panic!("Expected NoGroup, got {:?}", other.map(|m| m.len())),
        }
    }

    #[tokio::test]
    async fn test_seed_is_always_first() {
        let seed = item("seed.jpg", &["dunes"], 0.0);
        let mut items = vec![seed.clone()];
        for i in 0..6 {
            items.push(item(&format!("mate-{}.jpg", i), &["dunes"], 0.0));
        }
        let catalog = MemoryCatalog::new(items);

        let mut orders = BTreeSet::new();
        for rng_seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(rng_seed);
            let members = expand_group(&catalog, &seed, &policy(), None, NOW, &mut rng)
                .await
                .unwrap();

            assert_eq!(members.len(), 7);
            assert_eq!(members[0].filename, "seed.jpg");
            assert_eq!(
                members.iter().filter(|m| m.filename == "seed.jpg").count(),
                1
            );
            orders.insert(
                members
                    .iter()
                    .map(|m| m.filename.clone())
                    .collect::<Vec<_>>(),
            );
        }

        // The companions are shuffled, so different seeds give different orders
        assert!(orders.len() > 1);
    }

    #[tokio::test]
    async fn test_cooling_down_mates_are_dropped() {
        let seed = item("seed.jpg", &["dunes"], 0.0);
        let catalog = MemoryCatalog::new(vec![
            seed.clone(),
            item("cold.jpg", &["dunes"], 0.0),
            item("hot.jpg", &["dunes"], NOW - 60.0),
            item("elsewhere.jpg", &["night"], 0.0),
        ]);
        let mut rng = StdRng::seed_from_u64(9);

        let members = expand_group(&catalog, &seed, &policy(), None, NOW, &mut rng)
            .await
            .unwrap();

        let names: Vec<&str> = members.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(names, vec!["seed.jpg", "cold.jpg"]);
    }

    #[tokio::test]
    async fn test_media_type_filter_applies_to_mates() {
        let seed = item("seed.jpg", &["dunes"], 0.0);
        let mut clip = item("clip.mp4", &["dunes"], 0.0);
        clip.media_type = MediaType::Video;
        let catalog = MemoryCatalog::new(vec![seed.clone(), clip]);
        let mut rng = StdRng::seed_from_u64(2);

        let members = expand_group(
            &catalog,
            &seed,
            &policy(),
            Some(MediaType::Image),
            NOW,
            &mut rng,
        )
        .await
        .unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].filename, "seed.jpg");
    }

    #[tokio::test]
    async fn test_group_is_drawn_from_seed_groups() {
        let seed = item("seed.jpg", &["dunes", "night"], 0.0);
        let catalog = MemoryCatalog::new(vec![
            seed.clone(),
            item("dune-mate.jpg", &["dunes"], 0.0),
            item("night-mate.jpg", &["night"], 0.0),
        ]);

        let mut seen = BTreeSet::new();
        for rng_seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(rng_seed);
            let members = expand_group(&catalog, &seed, &policy(), None, NOW, &mut rng)
                .await
                .unwrap();
            assert_eq!(members.len(), 2);
            seen.insert(members[1].filename.clone());
        }

        assert_eq!(seen.len(), 2);
    }
}
