//! Publish orchestration
//!
//! One [`Publisher`] runs one posting job: select a seed, optionally expand it
//! into a group, stage the media with the platform client and publish. Both
//! publishing styles degrade instead of failing when a group post cannot be
//! fully assembled:
//!
//! | staged items | container style            | upload style              |
//! |--------------|----------------------------|---------------------------|
//! | 0            | `PublishFailed`            | `PublishFailed`           |
//! | 1            | publish that container     | submit with one ref       |
//! | 2+           | aggregate, then publish    | submit with all refs      |
//!
//! Cooldowns are written per item as soon as that item is staged, before the
//! final publish call.

use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::caption::CaptionComposer;
use crate::catalog::{CatalogStore, CooldownUpdate, MediaFilter};
use crate::error::{ClientError, PostingError};
use crate::grouping::expand_group;
use crate::platforms::{ContainerClient, PlatformClient, UploadClient};
use crate::selection::{select_candidate, CooldownPolicy, Selection, DEFAULT_MAX_TRIES};
use crate::types::{now_epoch, MediaItem, MediaType, Platform, PostKind, PostMode, PublishReport};

/// Default cooldown between two posts of the same item
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default percentage of `random` runs that attempt a group post
pub const DEFAULT_CAROUSEL_CHANCE_PERCENT: u8 = 20;

/// Tunables for one platform job
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    pub platform: Platform,
    pub cooldown: Duration,
    pub max_tries: u32,
    /// Restrict candidates (and group-mates) to one media type
    pub media_type: Option<MediaType>,
    pub mode: PostMode,
    pub carousel_chance_percent: u8,
    /// Inclusive range the per-run bound on staged items is drawn from
    pub group_range: RangeInclusive<usize>,
}

impl PublishSettings {
    /// Defaults for a platform
    ///
    /// Container platforms post a group in 20% of runs with 2 to 10 items. X
    /// always tries a group of 1 to 4 images.
    pub fn for_platform(platform: Platform) -> Self {
        let (mode, group_range) = match platform {
            Platform::X => (PostMode::Carousel, 1..=4),
            _ => (PostMode::Random, 2..=10),
        };

        Self {
            platform,
            cooldown: DEFAULT_COOLDOWN,
            max_tries: DEFAULT_MAX_TRIES,
            media_type: None,
            mode,
            carousel_chance_percent: DEFAULT_CAROUSEL_CHANCE_PERCENT,
            group_range,
        }
    }
}

/// Result of [`Publisher::run`]
#[derive(Debug)]
pub enum RunOutcome {
    Published(PublishReport),
    /// Every draw hit an item that is still cooling down
    NothingToPost { attempts: u32 },
    Failed(PostingError),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    /// Process exit code for `--strict` runs
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Failed(err) => err.exit_code(),
            _ => 0,
        }
    }

    /// Machine-readable form for `--format json`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RunOutcome::Published(report) => serde_json::json!({
                "status": "published",
                "report": report,
            }),
            RunOutcome::NothingToPost { attempts } => serde_json::json!({
                "status": "nothing_to_post",
                "attempts": attempts,
            }),
            RunOutcome::Failed(err) => serde_json::json!({
                "status": "failed",
                "error": err.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Published(report) => {
                let kind = match report.kind {
                    PostKind::Single => "single",
                    PostKind::Carousel => "carousel",
                };
                write!(
                    f,
                    "{}: published {} post {} ({})",
                    report.platform,
                    kind,
                    report.post_id,
                    report.filenames.join(", ")
                )?;
                if report.degraded {
                    write!(f, " [degraded]")?;
                }
                Ok(())
            }
            RunOutcome::NothingToPost { attempts } => {
                write!(f, "nothing to post after {} attempts", attempts)
            }
            RunOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Members to try and how many of them may be staged
struct Plan {
    members: Vec<MediaItem>,
    bound: usize,
}

impl Plan {
    fn single(seed: MediaItem) -> Self {
        Self {
            members: vec![seed],
            bound: 1,
        }
    }

    /// More than one item is expected to make it into the post
    fn is_group(&self) -> bool {
        self.members.len().min(self.bound) > 1
    }
}

/// Runs the posting protocol for one platform
pub struct Publisher<R: Rng> {
    catalog: Arc<dyn CatalogStore>,
    composer: Box<dyn CaptionComposer>,
    settings: PublishSettings,
    rng: R,
    now: Option<f64>,
}

impl<R: Rng> Publisher<R> {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        composer: Box<dyn CaptionComposer>,
        settings: PublishSettings,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            composer,
            settings,
            rng,
            now: None,
        }
    }

    /// Pin the clock used for eligibility checks and cooldown writes
    pub fn with_now(mut self, now: f64) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Run once and fold the result into a [`RunOutcome`]
    pub async fn run(&mut self, client: &PlatformClient) -> RunOutcome {
        match self.publish(client).await {
            Ok(report) => {
                info!(
                    "Published {} to {} as {}",
                    report.filenames.join(", "),
                    report.platform,
                    report.post_id
                );
                RunOutcome::Published(report)
            }
            Err(PostingError::NoEligibleMedia { attempts }) => {
                info!("Nothing to post on {}", self.settings.platform);
                RunOutcome::NothingToPost { attempts }
            }
            Err(err) => {
                error!("Posting to {} failed: {}", self.settings.platform, err);
                RunOutcome::Failed(err)
            }
        }
    }

    /// Select, stage and publish one post
    ///
    /// # Errors
    ///
    /// - [`PostingError::EmptyCandidatePool`] if nothing matches the type filter
    /// - [`PostingError::NoEligibleMedia`] if every draw was cooling down
    /// - [`PostingError::PublishFailed`] if nothing could be staged or the
    ///   final publish call failed
    /// - [`PostingError::Compose`] if the only caption needed cannot be built
    pub async fn publish(&mut self, client: &PlatformClient) -> Result<PublishReport, PostingError> {
        let now = self.now.unwrap_or_else(now_epoch);
        let policy = CooldownPolicy::new(self.settings.platform, self.settings.cooldown);
        let filter = MediaFilter::new().with_media_type(self.settings.media_type);

        let selection = select_candidate(
            self.catalog.as_ref(),
            &filter,
            &policy,
            self.settings.max_tries,
            now,
            &mut self.rng,
        )
        .await?;

        let seed = match selection {
            Selection::Eligible { item, .. } => item,
            Selection::Exhausted { attempts } => {
                return Err(PostingError::NoEligibleMedia { attempts })
            }
        };

        let plan = self.plan(seed, &policy, now).await;
        debug!(
            "Planned {} member(s) with bound {} on {}",
            plan.members.len(),
            plan.bound,
            client.name()
        );

        match client {
            PlatformClient::Container(client) => {
                self.publish_containers(client.as_ref(), plan, now).await
            }
            PlatformClient::Upload(client) => self.publish_uploads(client.as_ref(), plan, now).await,
        }
    }

    fn wants_group(&mut self) -> bool {
        match self.settings.mode {
            PostMode::Single => false,
            PostMode::Carousel => true,
            PostMode::Random => self
                .rng
                .gen_ratio(u32::from(self.settings.carousel_chance_percent.min(100)), 100),
        }
    }

    async fn plan(&mut self, seed: MediaItem, policy: &CooldownPolicy, now: f64) -> Plan {
        if !self.wants_group() {
            return Plan::single(seed);
        }

        let members = match expand_group(
            self.catalog.as_ref(),
            &seed,
            policy,
            self.settings.media_type,
            now,
            &mut self.rng,
        )
        .await
        {
            Ok(members) => members,
            Err(PostingError::NoGroup(_)) => {
                debug!("{:?} has no group, posting it alone", seed.filename);
                return Plan::single(seed);
            }
            Err(err) => {
                warn!("Group expansion for {:?} failed: {}", seed.filename, err);
                return Plan::single(seed);
            }
        };

        let bound = self.rng.gen_range(self.settings.group_range.clone());
        Plan { members, bound }
    }

    async fn mark_posted(&self, item: &MediaItem, now: f64) {
        match self
            .catalog
            .update_cooldown(&item.filename, self.settings.platform, now)
            .await
        {
            Ok(CooldownUpdate::Updated) => {}
            Ok(CooldownUpdate::NotFound) => {
                warn!("Cooldown not recorded: {:?} is not in the catalog", item.filename)
            }
            Err(err) => warn!("Cooldown not recorded for {:?}: {}", item.filename, err),
        }
    }

    async fn publish_containers(
        &mut self,
        client: &dyn ContainerClient,
        plan: Plan,
        now: f64,
    ) -> Result<PublishReport, PostingError> {
        let carousel = plan.is_group();
        let attempted = plan.members.len().min(plan.bound);
        let mut failures = FailureLog::default();
        let mut staged: Vec<(String, MediaItem)> = Vec::new();

        for item in plan.members {
            if staged.len() >= plan.bound {
                break;
            }

            let caption = match self.composer.compose_single(&item, &mut self.rng) {
                Ok(caption) => caption,
                Err(err) => {
                    warn!("Skipping {:?}: {}", item.filename, err);
                    continue;
                }
            };

            match client
                .create_container(&item.url, Some(&caption), carousel)
                .await
            {
                Ok(container_id) => {
                    debug!("Staged {:?} as {}", item.filename, container_id);
                    self.mark_posted(&item, now).await;
                    staged.push((container_id, item));
                }
                Err(err) => {
                    warn!("Container for {:?} failed: {}", item.filename, err);
                    failures.record(err);
                }
            }
        }

        match staged.len() {
            0 => Err(failures.into_error(format!(
                "no {} container could be created ({} attempted)",
                client.name(),
                attempted
            ))),
            1 => {
                let (container_id, item) = staged.remove(0);
                self.publish_single_container(client, &container_id, item, carousel)
                    .await
            }
            _ => {
                let items: Vec<MediaItem> = staged.iter().map(|(_, item)| item.clone()).collect();
                let child_ids: Vec<String> = staged.iter().map(|(id, _)| id.clone()).collect();

                let aggregate = match self.composer.compose_aggregate(&items, &mut self.rng) {
                    Ok(caption) => match client
                        .create_aggregate_container(&child_ids, &caption)
                        .await
                    {
                        Ok(aggregate_id) => Some(aggregate_id),
                        Err(err) => {
                            warn!("Aggregate container failed: {}", err);
                            None
                        }
                    },
                    Err(err) => {
                        warn!("Aggregate caption failed: {}", err);
                        None
                    }
                };

                match aggregate {
                    Some(aggregate_id) => {
                        let post_id = client
                            .publish(&aggregate_id)
                            .await
                            .map_err(|err| publish_error(client.name(), err))?;

                        Ok(PublishReport {
                            platform: self.settings.platform,
                            post_id,
                            kind: PostKind::Carousel,
                            filenames: items.into_iter().map(|item| item.filename).collect(),
                            degraded: false,
                        })
                    }
                    None => {
                        let (container_id, item) = staged.remove(0);
                        self.publish_single_container(client, &container_id, item, true)
                            .await
                    }
                }
            }
        }
    }

    async fn publish_single_container(
        &self,
        client: &dyn ContainerClient,
        container_id: &str,
        item: MediaItem,
        degraded: bool,
    ) -> Result<PublishReport, PostingError> {
        let post_id = client
            .publish(container_id)
            .await
            .map_err(|err| publish_error(client.name(), err))?;

        Ok(PublishReport {
            platform: self.settings.platform,
            post_id,
            kind: PostKind::Single,
            filenames: vec![item.filename],
            degraded,
        })
    }

    async fn publish_uploads(
        &mut self,
        client: &dyn UploadClient,
        plan: Plan,
        now: f64,
    ) -> Result<PublishReport, PostingError> {
        let planned_group = plan.is_group();
        let attempted = plan.members.len().min(plan.bound);
        let mut failures = FailureLog::default();
        let mut uploaded: Vec<(String, MediaItem)> = Vec::new();

        for item in plan.members {
            if uploaded.len() >= plan.bound {
                break;
            }

            let bytes = match client.fetch_media(&item.url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("Fetching {:?} failed: {}", item.filename, err);
                    failures.record(err);
                    continue;
                }
            };

            match client.upload_media(&bytes).await {
                Ok(media_ref) => {
                    debug!("Uploaded {:?} as {}", item.filename, media_ref);
                    self.mark_posted(&item, now).await;
                    uploaded.push((media_ref, item));
                }
                Err(err) => {
                    warn!("Upload of {:?} failed: {}", item.filename, err);
                    failures.record(err);
                }
            }
        }

        if uploaded.is_empty() {
            return Err(failures.into_error(format!(
                "no media could be uploaded to {} ({} attempted)",
                client.name(),
                attempted
            )));
        }

        let (text, included, kind, degraded) = if uploaded.len() == 1 {
            let text = self.composer.compose_single(&uploaded[0].1, &mut self.rng)?;
            (text, uploaded, PostKind::Single, planned_group)
        } else {
            let items: Vec<MediaItem> = uploaded.iter().map(|(_, item)| item.clone()).collect();
            match self.composer.compose_aggregate(&items, &mut self.rng) {
                Ok(text) => (text, uploaded, PostKind::Carousel, false),
                Err(err) => {
                    warn!("Aggregate caption failed, posting the first item alone: {}", err);
                    uploaded.truncate(1);
                    let text = self.composer.compose_single(&uploaded[0].1, &mut self.rng)?;
                    (text, uploaded, PostKind::Single, true)
                }
            }
        };

        let (media_refs, items): (Vec<String>, Vec<MediaItem>) = included.into_iter().unzip();
        let post_id = client
            .submit_post(&text, &media_refs)
            .await
            .map_err(|err| publish_error(client.name(), err))?;

        Ok(PublishReport {
            platform: self.settings.platform,
            post_id,
            kind,
            filenames: items.into_iter().map(|item| item.filename).collect(),
            degraded,
        })
    }
}

/// Final-step failures keep authentication problems distinct so callers can
/// tell an expired token from a transient error
fn publish_error(platform: &str, err: ClientError) -> PostingError {
    match err {
        ClientError::Authentication(_) => PostingError::Client(err),
        other => PostingError::PublishFailed(format!("{}: {}", platform, other)),
    }
}

/// Per-item client failures seen while staging
#[derive(Default)]
struct FailureLog {
    total: usize,
    last_auth: Option<ClientError>,
    auth: usize,
}

impl FailureLog {
    fn record(&mut self, err: ClientError) {
        self.total += 1;
        if matches!(err, ClientError::Authentication(_)) {
            self.auth += 1;
            self.last_auth = Some(err);
        }
    }

    fn into_error(self, message: String) -> PostingError {
        match self.last_auth {
            Some(err) if self.auth == self.total => PostingError::Client(err),
            _ => PostingError::PublishFailed(message),
        }
    }
}
