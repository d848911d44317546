use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, warn};

use super::cache::{now_millis, CacheState, LocationCache};
use super::distances::{distance_labels, DistanceLabel};
use super::provider::{GeolocationError, GeolocationProvider, PositionOptions};
use crate::catalog::ItemCard;
use crate::geo::Coordinate;
use crate::notify::NotificationCenter;

/// First decision on page load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationStep {
    /// A fresh cached coordinate; no detection needed
    Ready(Coordinate),
    /// Cache missing or stale; run [`LocationService::detect`]
    Detect,
    /// Nothing cached and no provider to ask
    Unsupported,
}

impl LocationStep {
    /// Labels to show while this step is pending, if any.
    pub fn placeholder(&self) -> Option<DistanceLabel> {
        match self {
            LocationStep::Ready(_) => None,
            LocationStep::Detect => Some(DistanceLabel::Detecting),
            LocationStep::Unsupported => Some(DistanceLabel::NotSupported),
        }
    }
}

/// Where the pipeline ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Located {
        coordinate: Coordinate,
        /// True when the coordinate came from the cache
        cached: bool,
    },
    Failed(GeolocationError),
    Unsupported,
}

impl LocationOutcome {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            LocationOutcome::Located { coordinate, .. } => Some(*coordinate),
            _ => None,
        }
    }

    /// Distance label for every item under this outcome.
    pub fn labels(&self, items: &[ItemCard]) -> Vec<DistanceLabel> {
        match self {
            LocationOutcome::Located { coordinate, .. } => distance_labels(coordinate, items),
            LocationOutcome::Failed(_) => vec![DistanceLabel::Unavailable; items.len()],
            LocationOutcome::Unsupported => vec![DistanceLabel::NotSupported; items.len()],
        }
    }
}

/// Owns the location cache and the provider for one session.
#[derive(Clone)]
pub struct LocationService {
    cache: LocationCache,
    provider: Option<Arc<dyn GeolocationProvider>>,
    options: PositionOptions,
    notifications: NotificationCenter,
}

impl LocationService {
    /// `provider: None` means geolocation is not supported.
    pub fn new(
        cache: LocationCache,
        provider: Option<Arc<dyn GeolocationProvider>>,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            cache,
            provider,
            options: PositionOptions::default(),
            notifications,
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn begin(&self, now_ms: i64) -> LocationStep {
        match self.cache.state(now_ms) {
            CacheState::Fresh(cached) => LocationStep::Ready(cached.coordinate),
            CacheState::Stale(_) | CacheState::Unknown if self.provider.is_none() => {
                info!("Geolocation not supported");
                LocationStep::Unsupported
            }
            CacheState::Stale(_) | CacheState::Unknown => LocationStep::Detect,
        }
    }

    /// Request the current position.
    ///
    /// The returned future owns everything it needs, so it can be spawned.
    /// The timeout is enforced here too, so a provider that never answers
    /// still ends in [`GeolocationError::Timeout`]. Returns `None` when there
    /// is no provider.
    pub fn detect(&self) -> Option<BoxFuture<'static, Result<Coordinate, GeolocationError>>> {
        let provider = self.provider.clone()?;
        let options = self.options;
        info!(provider = provider.name(), "Requesting current position");
        let request = provider.current_position(&options);

        Some(
            async move {
                match tokio::time::timeout(options.timeout, request).await {
                    Ok(result) => result,
                    Err(_) => Err(GeolocationError::Timeout),
                }
            }
            .boxed(),
        )
    }

    /// Record a detection result: cache and announce a success, announce a
    /// failure without touching the cache.
    pub fn complete(
        &self,
        result: Result<Coordinate, GeolocationError>,
        now_ms: i64,
    ) -> LocationOutcome {
        match result {
            Ok(coordinate) => {
                debug!(lat = coordinate.latitude, lng = coordinate.longitude, "Location detected");
                if let Err(e) = self.cache.store(coordinate, now_ms) {
                    warn!(error = %e, "Failed to cache detected location");
                }
                self.notifications.success("Location detected");
                LocationOutcome::Located {
                    coordinate,
                    cached: false,
                }
            }
            Err(error) => {
                warn!(code = error.code(), error = %error, "Location error");
                self.notifications.warning(error.user_message());
                LocationOutcome::Failed(error)
            }
        }
    }

    /// Run the whole pipeline in place: cache check, detection, recording.
    pub async fn resolve(&self) -> LocationOutcome {
        match self.begin(now_millis()) {
            LocationStep::Ready(coordinate) => LocationOutcome::Located {
                coordinate,
                cached: true,
            },
            LocationStep::Unsupported => LocationOutcome::Unsupported,
            LocationStep::Detect => match self.detect() {
                Some(request) => {
                    let result = request.await;
                    self.complete(result, now_millis())
                }
                None => LocationOutcome::Unsupported,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::location::cache::{LOCATION_FRESH_MS, LOCATION_KEY};
    use crate::location::provider::{DeniedProvider, FixedProvider};
    use crate::notify::NotificationLevel;
    use crate::storage::{MemoryStorage, SharedStorage, Storage};

    const HERE: Coordinate = Coordinate { latitude: 55.75, longitude: 37.61 };

    /// Fixed provider that counts how often it is asked.
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    impl GeolocationProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(HERE)).boxed()
        }
    }

    /// Provider that never answers.
    struct HangingProvider;

    impl GeolocationProvider for HangingProvider {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>> {
            futures::future::pending().boxed()
        }
    }

    fn service_with(
        provider: Option<Arc<dyn GeolocationProvider>>,
    ) -> (LocationService, SharedStorage, NotificationCenter) {
        let storage = MemoryStorage::shared();
        let notifications = NotificationCenter::new();
        let service = LocationService::new(
            LocationCache::new(storage.clone()),
            provider,
            notifications.clone(),
        );
        (service, storage, notifications)
    }

    fn counting() -> (Arc<dyn GeolocationProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Arc::new(CountingProvider { calls: calls.clone() }), calls)
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_detection() {
        let (provider, calls) = counting();
        let (service, storage, notifications) = service_with(Some(provider));
        let cached = Coordinate::new(48.85, 2.35);
        LocationCache::new(storage)
            .store(cached, now_millis() - LOCATION_FRESH_MS + 60_000)
            .unwrap();

        let outcome = service.resolve().await;
        assert_eq!(
            outcome,
            LocationOutcome::Located {
                coordinate: cached,
                cached: true
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(notifications.drain().is_empty());
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_detection_and_overwrites() {
        let (provider, calls) = counting();
        let (service, storage, notifications) = service_with(Some(provider));
        let old = now_millis() - LOCATION_FRESH_MS - 1;
        LocationCache::new(storage.clone())
            .store(Coordinate::new(48.85, 2.35), old)
            .unwrap();

        let outcome = service.resolve().await;
        assert_eq!(
            outcome,
            LocationOutcome::Located {
                coordinate: HERE,
                cached: false
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Now fresh, so a second load does not ask again
        assert_eq!(service.begin(now_millis()), LocationStep::Ready(HERE));

        let raised = notifications.drain();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].level, NotificationLevel::Success);
    }

    #[test]
    fn test_begin_without_provider_is_unsupported() {
        let (service, _, _) = service_with(None);
        let step = service.begin(now_millis());
        assert_eq!(step, LocationStep::Unsupported);
        assert_eq!(step.placeholder(), Some(DistanceLabel::NotSupported));
        assert!(service.detect().is_none());
    }

    #[test]
    fn test_fresh_cache_wins_even_without_provider() {
        let (service, storage, _) = service_with(None);
        let now = now_millis();
        LocationCache::new(storage).store(HERE, now).unwrap();
        assert_eq!(service.begin(now), LocationStep::Ready(HERE));
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let (service, storage, notifications) = service_with(Some(Arc::new(DeniedProvider)));
        let stale = r#"{"lat":1.5,"lng":2.5,"timestamp":1}"#;
        storage.set_item(LOCATION_KEY, stale).unwrap();

        let outcome = service.resolve().await;
        assert_eq!(outcome, LocationOutcome::Failed(GeolocationError::PermissionDenied));
        assert_eq!(storage.get_item(LOCATION_KEY).unwrap().as_deref(), Some(stale));

        let raised = notifications.drain();
        assert_eq!(raised[0].level, NotificationLevel::Warning);
        assert_eq!(raised[0].message, "Access to geolocation denied");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out() {
        let (service, _, _) = service_with(Some(Arc::new(HangingProvider)));
        let service = service.with_options(PositionOptions {
            timeout: Duration::from_millis(50),
            ..PositionOptions::default()
        });

        let outcome = service.resolve().await;
        assert_eq!(outcome, LocationOutcome::Failed(GeolocationError::Timeout));
    }

    #[test]
    fn test_outcome_labels() {
        let items = vec![
            ItemCard {
                latitude: Some("55.76".into()),
                longitude: Some("37.62".into()),
                ..ItemCard::default()
            },
            ItemCard::default(),
        ];

        let located = LocationOutcome::Located {
            coordinate: HERE,
            cached: true,
        };
        let labels = located.labels(&items);
        assert!(matches!(labels[0], DistanceLabel::Km(_)));
        assert_eq!(labels[1], DistanceLabel::AddressMissing);

        let failed = LocationOutcome::Failed(GeolocationError::Timeout);
        assert_eq!(failed.labels(&items), vec![DistanceLabel::Unavailable; 2]);
        assert_eq!(
            LocationOutcome::Unsupported.labels(&items),
            vec![DistanceLabel::NotSupported; 2]
        );
    }

    #[tokio::test]
    async fn test_fixed_provider_end_to_end() {
        let (service, _, _) = service_with(Some(Arc::new(FixedProvider::new(HERE))));
        assert_eq!(service.begin(now_millis()), LocationStep::Detect);
        assert_eq!(service.resolve().await.coordinate(), Some(HERE));
    }
}
