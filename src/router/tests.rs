//! Tests for NoteRouter

use super::*;
use crate::devices::recording::{device_config, recording_factory, Recorder, TYPE_TAG};
use crate::devices::DeviceFactory;
use std::sync::Arc;

fn mapping(device: &str, endpoint: &str, channel: i32, note: &str, octave: i32) -> MappingConfig {
    MappingConfig {
        device: device.to_string(),
        endpoint: endpoint.to_string(),
        channel,
        note: note.to_string(),
        octave,
    }
}

fn make_registry(recorder: &Arc<Recorder>, names: &[&str]) -> DeviceRegistry {
    let configs: Vec<_> = names.iter().map(|n| device_config(n, TYPE_TAG)).collect();
    DeviceRegistry::from_config(&configs, &recording_factory(recorder.clone())).unwrap()
}

#[tokio::test]
async fn test_dispatch_matches_identity() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);
    let router = NoteRouter::from_mappings(
        &[mapping("Rec1", "E1", 0, "C", 4), mapping("Rec1", "E2", 0, "D", 4)],
        &registry,
    )
    .unwrap();

    let c4 = NoteIdentity::from_key(0, 60).unwrap();
    assert_eq!(router.dispatch(&c4, NoteCommand::NoteOn).await, 1);

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "E1");
    assert_eq!(calls[0].command, NoteCommand::NoteOn);
}

#[tokio::test]
async fn test_dispatch_unbound_identity_is_noop() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);
    let router =
        NoteRouter::from_mappings(&[mapping("Rec1", "E1", 0, "C", 4)], &registry).unwrap();

    // Same note, different channel and octave
    let other_channel = NoteIdentity::from_key(1, 60).unwrap();
    let other_octave = NoteIdentity::from_key(0, 72).unwrap();
    assert_eq!(router.dispatch(&other_channel, NoteCommand::NoteOn).await, 0);
    assert_eq!(router.dispatch(&other_octave, NoteCommand::NoteOn).await, 0);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_fan_out_in_registration_order() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1", "Rec2"]);
    let router = NoteRouter::from_mappings(
        &[
            mapping("Rec2", "E9", 3, "A", 4),
            mapping("Rec1", "E1", 3, "C", 4),
            mapping("Rec1", "E5", 3, "A", 4),
        ],
        &registry,
    )
    .unwrap();

    let a4 = NoteIdentity::new(3, "A", 4).unwrap();
    assert_eq!(router.dispatch(&a4, NoteCommand::NoteOn).await, 2);
    assert_eq!(router.dispatch(&a4, NoteCommand::NoteOff).await, 2);

    let calls: Vec<_> = recorder
        .calls()
        .into_iter()
        .map(|c| (c.device, c.endpoint, c.command))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("Rec2".to_string(), "E9".to_string(), NoteCommand::NoteOn),
            ("Rec1".to_string(), "E5".to_string(), NoteCommand::NoteOn),
            ("Rec2".to_string(), "E9".to_string(), NoteCommand::NoteOff),
            ("Rec1".to_string(), "E5".to_string(), NoteCommand::NoteOff),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_mappings_both_fire() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);
    let router = NoteRouter::from_mappings(
        &[mapping("Rec1", "E1", 0, "G", 2), mapping("Rec1", "E1", 0, "G", 2)],
        &registry,
    )
    .unwrap();

    let g2 = NoteIdentity::new(0, "G", 2).unwrap();
    assert_eq!(router.bindings_for(&g2).count(), 2);
    assert_eq!(router.dispatch(&g2, NoteCommand::NoteOn).await, 2);
    assert_eq!(recorder.calls().len(), 2);
}

#[test]
fn test_unknown_device_reference() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);

    let result = NoteRouter::from_mappings(&[mapping("Nope", "E1", 0, "C", 4)], &registry);
    assert!(matches!(result, Err(PlayError::UnknownDeviceReference(name)) if name == "Nope"));
}

#[test]
fn test_invalid_identity_fails_fast() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);

    for bad in [
        mapping("Rec1", "E1", 16, "C", 4),
        mapping("Rec1", "E1", -1, "C", 4),
        mapping("Rec1", "E1", 0, "C", 10),
        mapping("Rec1", "E1", 0, "C", -2),
        mapping("Rec1", "E1", 0, "Db", 4),
    ] {
        let result =
            NoteRouter::from_mappings(&[mapping("Rec1", "E1", 0, "C", 4), bad.clone()], &registry);
        assert!(
            matches!(result, Err(PlayError::InvalidNoteIdentity(_))),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_endpoint_checked_against_owning_device() {
    let recorder = Arc::new(Recorder::default());
    let configs = vec![device_config("Rec1", TYPE_TAG), device_config("Board1", "board")];
    let registry =
        DeviceRegistry::from_config(&configs, &recording_factory(recorder.clone())).unwrap();

    // "R1" is valid for the board but not for the recording device
    assert!(NoteRouter::from_mappings(&[mapping("Board1", "R1", 0, "C", 4)], &registry).is_ok());
    let result = NoteRouter::from_mappings(&[mapping("Rec1", "R1", 0, "C", 4)], &registry);
    assert!(matches!(
        result,
        Err(PlayError::InvalidEndpointSyntax { device, endpoint, .. })
            if device == "Rec1" && endpoint == "R1"
    ));
}

#[test]
fn test_board_endpoint_rule() {
    let configs = vec![device_config("Board1", "board")];
    let registry = DeviceRegistry::from_config(&configs, &DeviceFactory::default()).unwrap();

    for endpoint in ["R1", "R16", "AR2"] {
        assert!(
            NoteRouter::from_mappings(&[mapping("Board1", endpoint, 0, "C", 4)], &registry).is_ok()
        );
    }
    let result = NoteRouter::from_mappings(&[mapping("Board1", "X1", 0, "C", 4)], &registry);
    assert!(matches!(result, Err(PlayError::InvalidEndpointSyntax { .. })));
}

#[test]
fn test_empty_mappings() {
    let recorder = Arc::new(Recorder::default());
    let registry = make_registry(&recorder, &["Rec1"]);

    let router = NoteRouter::from_mappings(&[], &registry).unwrap();
    assert!(router.is_empty());
    assert_eq!(router.len(), 0);
}
