//! Tests for the in-memory broker.

use super::*;
use std::time::Duration;

fn stat() -> StreamName {
    StreamName::new("Stat").unwrap()
}

fn p0() -> PartitionIndex {
    PartitionIndex::new(0).unwrap()
}

async fn open(broker: &InMemoryBroker, start: StartOffset) -> Box<dyn PartitionReader> {
    let connection = broker.connect().await.expect("connect should succeed");
    connection
        .open_partition(&stat(), p0(), start)
        .await
        .expect("open should succeed")
}

#[tokio::test]
async fn test_publish_assigns_sequential_offsets() {
    let broker = InMemoryBroker::default();

    let first = broker.publish(&stat(), p0(), Some("Like"), "a").unwrap();
    let second = broker.publish(&stat(), p0(), Some("View"), "b").unwrap();

    assert_eq!(first, 0);
    assert_eq!(second, 1);
    assert_eq!(broker.len(&stat(), p0()).unwrap(), 2);
}

#[tokio::test]
async fn test_publish_to_unknown_stream_fails() {
    let broker = InMemoryBroker::default();
    let missing = StreamName::new("Missing").unwrap();

    let result = broker.publish(&missing, p0(), None, "x");

    match result {
        Err(StreamError::StreamNotFound { stream }) => assert_eq!(stream, "Missing"),
        other => panic!("Expected StreamNotFound, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_stream_makes_stream_publishable() {
    let broker = InMemoryBroker::default();
    let orders = StreamName::new("Orders").unwrap();

    broker.create_stream(&orders);

    assert_eq!(broker.publish(&orders, p0(), None, "x").unwrap(), 0);
}

#[tokio::test]
async fn test_earliest_reader_sees_existing_records_in_order() {
    let broker = InMemoryBroker::default();
    broker
        .publish(&stat(), p0(), Some("Like"), "first")
        .unwrap();
    broker
        .publish(&stat(), p0(), Some("View"), "second")
        .unwrap();

    let mut reader = open(&broker, StartOffset::Earliest).await;

    let first = reader.next_record().await.unwrap().unwrap();
    let second = reader.next_record().await.unwrap().unwrap();
    assert_eq!(first.value, Bytes::from_static(b"first"));
    assert_eq!(first.key_str(), Some("Like"));
    assert_eq!(first.offset, 0);
    assert_eq!(second.value, Bytes::from_static(b"second"));
    assert_eq!(second.offset, 1);
}

#[tokio::test]
async fn test_newest_reader_skips_records_published_before_open() {
    let broker = InMemoryBroker::default();
    broker.publish(&stat(), p0(), Some("Like"), "old").unwrap();

    let mut reader = open(&broker, StartOffset::Newest).await;
    broker.publish(&stat(), p0(), Some("Like"), "new").unwrap();

    let record = reader.next_record().await.unwrap().unwrap();
    assert_eq!(record.value, Bytes::from_static(b"new"));
    assert_eq!(record.offset, 1);
}

#[tokio::test]
async fn test_explicit_offset_starts_mid_partition() {
    let broker = InMemoryBroker::default();
    for value in ["a", "b", "c"] {
        broker.publish(&stat(), p0(), None, value).unwrap();
    }

    let mut reader = open(&broker, StartOffset::At(2)).await;

    let record = reader.next_record().await.unwrap().unwrap();
    assert_eq!(record.value, Bytes::from_static(b"c"));
}

#[tokio::test]
async fn test_reader_waits_for_later_publish() {
    let broker = InMemoryBroker::default();
    let mut reader = open(&broker, StartOffset::Newest).await;

    let publisher = broker.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(&stat(), p0(), None, "late").unwrap();
    });

    let record = tokio::time::timeout(Duration::from_secs(5), reader.next_record())
        .await
        .expect("reader should wake on publish")
        .unwrap()
        .unwrap();
    assert_eq!(record.value, Bytes::from_static(b"late"));
    handle.await.unwrap();
}

#[tokio::test]
async fn test_reader_blocks_while_partition_is_empty() {
    let broker = InMemoryBroker::default();
    let mut reader = open(&broker, StartOffset::Earliest).await;

    let result = tokio::time::timeout(Duration::from_millis(50), reader.next_record()).await;

    assert!(result.is_err(), "Reader should still be waiting");
}

#[tokio::test]
async fn test_open_unknown_partition_fails() {
    let broker = InMemoryBroker::default();
    let connection = broker.connect().await.unwrap();

    let result = connection
        .open_partition(
            &stat(),
            PartitionIndex::new(3).unwrap(),
            StartOffset::Newest,
        )
        .await;

    match result {
        Err(StreamError::PartitionNotFound { stream, partition }) => {
            assert_eq!(stream, "Stat");
            assert_eq!(partition, 3);
        }
        Err(other) => panic!("Expected PartitionNotFound, got: {:?}", other),
        Ok(_) => panic!("Expected PartitionNotFound, got a reader"),
    }
}

#[tokio::test]
async fn test_open_after_close_fails() {
    let broker = InMemoryBroker::default();
    let connection = broker.connect().await.unwrap();

    connection.close();
    let result = connection
        .open_partition(&stat(), p0(), StartOffset::Newest)
        .await;

    assert!(matches!(result, Err(StreamError::ConnectionClosed)));
}

#[tokio::test]
async fn test_refuses_configured_number_of_connections() {
    let broker = InMemoryBroker::new(InMemoryConfig {
        refuse_first_connections: 2,
        ..InMemoryConfig::default()
    });

    assert!(broker.connect().await.is_err());
    assert!(broker.connect().await.is_err());
    assert!(broker.connect().await.is_ok());
    assert_eq!(broker.connect_attempts(), 3);
}

#[tokio::test]
async fn test_partitions_are_independent() {
    let broker = InMemoryBroker::new(InMemoryConfig {
        partitions_per_stream: 2,
        ..InMemoryConfig::default()
    });
    let p1 = PartitionIndex::new(1).unwrap();

    broker.publish(&stat(), p1, None, "other").unwrap();
    broker.publish(&stat(), p0(), None, "mine").unwrap();

    let mut reader = open(&broker, StartOffset::Earliest).await;
    let record = reader.next_record().await.unwrap().unwrap();
    assert_eq!(record.value, Bytes::from_static(b"mine"));
    assert_eq!(record.partition, p0());
}
