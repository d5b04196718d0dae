use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use futures::TryStreamExt;

use vessel_store::{
    clock::{Clock, ManualClock},
    memory::{InMemoryHistoryLog, InMemoryStateStore},
    models::{HistoryQuery, Mmsi, VesselObservation},
    Ingestor, VesselStoreError,
};

struct Harness {
    clock: Arc<ManualClock>,
    state: Arc<InMemoryStateStore>,
    history: Arc<InMemoryHistoryLog>,
    ingestor: Ingestor,
}

fn setup() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ));
    let state = Arc::new(InMemoryStateStore::new(clock.clone()));
    let history = Arc::new(InMemoryHistoryLog::new(clock.clone()));
    let ingestor = Ingestor::new(state.clone(), history.clone());

    Harness {
        clock,
        state,
        history,
        ingestor,
    }
}

fn position(mmsi: &str, lat: f64, lon: f64) -> VesselObservation {
    VesselObservation {
        latitude: Some(lat),
        longitude: Some(lon),
        ..VesselObservation::new(mmsi)
    }
}

async fn history_for(
    ingestor: &Ingestor,
    mmsi: &str,
) -> Result<Vec<vessel_store::HistoryEntry>, VesselStoreError> {
    ingestor
        .history(HistoryQuery::for_vessel(Mmsi::try_from(mmsi)?))
        .try_collect()
        .await
}

#[tokio::test]
async fn test_api_fetch_then_user_query() -> Result<(), VesselStoreError> {
    let h = setup();
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 11, 30, 0).unwrap();

    let first = VesselObservation {
        timestamp: Some(t0),
        ..position("123456789", 10.5, 20.1)
    };
    h.ingestor.ingest(&first, "API Fetch").await?;

    let current = h.ingestor.current("123456789").await?.unwrap();
    assert_eq!(current.observation.latitude, Some(10.5));
    assert_eq!(current.observation.longitude, Some(20.1));

    let entries = history_for(&h.ingestor, "123456789").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "API Fetch");

    h.clock.advance(TimeDelta::minutes(30));
    let second = VesselObservation {
        timestamp: Some(t1),
        ..position("123456789", 11.0, 20.1)
    };
    h.ingestor.ingest(&second, "User Query").await?;

    let current = h.ingestor.current("123456789").await?.unwrap();
    assert_eq!(current.observation.latitude, Some(11.0));

    let entries = history_for(&h.ingestor, "123456789").await?;
    let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["API Fetch", "User Query"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_vessel_is_not_found() -> Result<(), VesselStoreError> {
    let h = setup();
    assert_eq!(h.ingestor.current("999999999").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_cached_fields_equal_observation() -> Result<(), VesselStoreError> {
    let h = setup();
    let observation = VesselObservation {
        imo: Some(9811000),
        name: Some("EVER GIVEN".to_string()),
        timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 59, 0).unwrap()),
        length: Some(399.94),
        width: Some(58.8),
        draft: Some(14.5),
        cog: Some(229.6),
        heading: Some(230.0),
        weather: Some("Clear".to_string()),
        weather_description: Some("clear sky".to_string()),
        temperature: Some(24.3),
        pressure: Some(1013.0),
        humidity: Some(40.0),
        windspeed: Some(5.1),
        rain: Some("none".to_string()),
        clouds: Some(0.0),
        ..position("353136000", 30.0, 32.58)
    };

    h.ingestor.ingest(&observation, "API Fetch").await?;

    let current = h.ingestor.current("353136000").await?.unwrap();
    assert_eq!(current.observation, observation);
    assert_eq!(current.cached_at, h.clock.now());

    let entries = history_for(&h.ingestor, "353136000").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].observation, observation);
    Ok(())
}

#[tokio::test]
async fn test_reingest_keeps_cache_grows_history() -> Result<(), VesselStoreError> {
    let h = setup();
    let observation = position("123456789", 10.5, 20.1);

    h.ingestor.ingest(&observation, "API Fetch").await?;
    let after_first = h.ingestor.current("123456789").await?;
    h.ingestor.ingest(&observation, "API Fetch").await?;
    let after_second = h.ingestor.current("123456789").await?;

    assert_eq!(after_first, after_second);
    assert_eq!(history_for(&h.ingestor, "123456789").await?.len(), 2);
    assert_eq!(h.state.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_upsert_not_duplicate() -> Result<(), VesselStoreError> {
    let h = setup();
    h.ingestor
        .ingest(&position("123456789", 10.5, 20.1), "API Fetch")
        .await?;
    h.ingestor
        .ingest(&position("123456789", 11.0, 21.0), "API Fetch")
        .await?;

    assert_eq!(h.state.len().await, 1);
    let current = h.ingestor.current("123456789").await?.unwrap();
    assert_eq!(current.observation, position("123456789", 11.0, 21.0));
    Ok(())
}

#[tokio::test]
async fn test_expiry_window() -> Result<(), VesselStoreError> {
    let h = setup();
    h.ingestor
        .ingest(&position("123456789", 10.5, 20.1), "API Fetch")
        .await?;

    h.clock.advance(TimeDelta::hours(23) + TimeDelta::minutes(59));
    assert!(h.ingestor.current("123456789").await?.is_some());

    h.clock.advance(TimeDelta::minutes(1) + TimeDelta::seconds(1));
    assert!(h.ingestor.current("123456789").await?.is_none());

    // History never expires
    assert_eq!(history_for(&h.ingestor, "123456789").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_history_query_by_creation_time() -> Result<(), VesselStoreError> {
    let h = setup();
    let start = h.clock.now();
    for lat in [1.0, 2.0, 3.0] {
        h.ingestor
            .ingest(&position("123456789", lat, 20.1), "API Fetch")
            .await?;
        h.clock.advance(TimeDelta::hours(1));
    }

    let window: Vec<_> = h
        .ingestor
        .history(
            HistoryQuery::new()
                .created_between(Some(start + TimeDelta::hours(1)), Some(start + TimeDelta::hours(2))),
        )
        .try_collect()
        .await?;
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].observation.latitude, Some(2.0));
    assert_eq!(h.history.len().await, 3);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_ingest_same_vessel() -> Result<(), VesselStoreError> {
    let h = setup();
    let mut tasks = Vec::new();
    for i in 0..16 {
        let ingestor = h.ingestor.clone();
        tasks.push(tokio::spawn(async move {
            let observation = VesselObservation {
                name: Some(format!("VESSEL {i}")),
                ..position("123456789", i as f64, i as f64)
            };
            ingestor.ingest(&observation, "API Fetch").await
        }));
    }
    for task in tasks {
        task.await.expect("ingest task panicked")?;
    }

    assert_eq!(history_for(&h.ingestor, "123456789").await?.len(), 16);
    assert_eq!(h.state.len().await, 1);

    // Cached state is one complete input, never a mix of two
    let current = h.ingestor.current("123456789").await?.unwrap();
    let i = current.observation.latitude.unwrap();
    assert_eq!(current.observation.longitude, Some(i));
    assert_eq!(current.observation.name, Some(format!("VESSEL {}", i as usize)));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_ingest_different_vessels() -> Result<(), VesselStoreError> {
    let h = setup();
    let mmsis: Vec<String> = (1..=8).map(|i| format!("23000000{i}")).collect();

    let results = futures::future::join_all(mmsis.iter().map(|mmsi| {
        let ingestor = &h.ingestor;
        let observation = position(mmsi, 60.0, 24.9);
        async move { ingestor.ingest(&observation, "API Fetch").await }
    }))
    .await;
    for result in results {
        result?;
    }

    for mmsi in &mmsis {
        assert!(h.ingestor.current(mmsi).await?.is_some());
        assert_eq!(history_for(&h.ingestor, mmsi).await?.len(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn test_mmsi_must_be_exactly_nine_digits() -> Result<(), VesselStoreError> {
    let h = setup();

    for raw in ["123", "12345678", "1234567890", " 244110352 ", "244110352\n"] {
        let result = h.ingestor.ingest(&position(raw, 10.5, 20.1), "API Fetch").await;
        assert!(
            matches!(result, Err(VesselStoreError::InvalidMmsi(_))),
            "{raw:?} accepted"
        );
    }
    assert!(h.state.is_empty().await);
    assert_eq!(h.history.len().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_zero_padded_mmsi_is_its_own_vessel() -> Result<(), VesselStoreError> {
    let h = setup();
    let observation = position("000000123", 10.5, 20.1);

    h.ingestor.ingest(&observation, "API Fetch").await?;

    let current = h.ingestor.current("000000123").await?.unwrap();
    assert_eq!(current.observation, observation);
    assert!(matches!(
        h.ingestor.current("123").await,
        Err(VesselStoreError::InvalidMmsi(_))
    ));
    Ok(())
}
