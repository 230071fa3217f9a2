//! Play plans and volume behaviour observed through an in-memory zone

use std::sync::Arc;

use proptest::prelude::*;

use page_sets::{
    resolve, LibraryItem, PageSet, PageSetDefinition, PlayDescriptor, PlayPlan, SectionDefinition,
    StaticLibrary,
};
use zone_control::memory::{MemoryDirectory, MemoryZone, PlayerCall};
use zone_control::{
    apply_volume_delta, TransportState, ZoneController, ZonePlayer, DEFAULT_OPERATION_TIMEOUT,
};

// ============================================================================
// Test Helpers
// ============================================================================

async fn connect(zone: MemoryZone) -> (ZoneController, Arc<MemoryZone>) {
    let name = zone.name().to_string();
    let directory = Arc::new(MemoryDirectory::new().with_zone(zone));
    let handle = directory.get(&name).unwrap();
    let controller = ZoneController::connect(directory, &name, DEFAULT_OPERATION_TIMEOUT)
        .await
        .unwrap();
    (controller, handle)
}

// ============================================================================
// Play plans
// ============================================================================

#[tokio::test]
async fn test_favorite_plan_call_order() {
    let library = StaticLibrary::new().with_favorite(LibraryItem::new("KEXP", "F"));
    let definition = PageSetDefinition {
        page_set_name: "Radio".to_string(),
        sections: vec![SectionDefinition::Favorites {
            start_label: 0,
            start_list: 0,
            end_list: 0,
        }],
    };
    let page_set = PageSet::materialize("t", &definition, &library).await.unwrap();
    let resolution = resolve(0, &page_set).unwrap();

    let (controller, zone) = connect(MemoryZone::new("Kitchen")).await;
    assert!(controller.enqueue_and_play(&resolution.plan).await);

    assert_eq!(
        zone.calls(),
        vec![
            PlayerCall::ClearQueue,
            PlayerCall::AddToQueue(PlayDescriptor::new("F")),
            PlayerCall::PlayFromQueue(0),
        ]
    );
    assert_eq!(zone.current_transport(), TransportState::Playing);
}

#[tokio::test]
async fn test_empty_slot_issues_no_commands() {
    let (controller, zone) = connect(MemoryZone::new("Kitchen")).await;
    let resolution = resolve(42, &PageSet::blank("t", "Blank")).unwrap();

    assert!(controller.enqueue_and_play(&resolution.plan).await);
    assert!(zone.calls().is_empty());
}

#[tokio::test]
async fn test_repeated_plan_replaces_queue() {
    let (controller, zone) = connect(MemoryZone::new("Kitchen")).await;
    let plan = PlayPlan::Track(PlayDescriptor::new("uri:t"));

    assert!(controller.enqueue_and_play(&plan).await);
    assert!(controller.enqueue_and_play(&plan).await);

    assert_eq!(zone.queue(), vec![PlayDescriptor::new("uri:t")]);
}

// ============================================================================
// Volume saturation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any delta applied to any volume lands in 0..=100.
    #[test]
    fn prop_volume_delta_saturates(current in 0u8..=100, delta in any::<i32>()) {
        let volume = apply_volume_delta(current, delta);
        prop_assert!(volume <= 100);
        if delta >= 0 {
            prop_assert!(volume >= current);
        } else {
            prop_assert!(volume <= current);
        }
    }
}

#[tokio::test]
async fn test_repeated_steps_stay_in_range() {
    let (controller, zone) = connect(MemoryZone::new("Kitchen").with_volume(90)).await;

    for _ in 0..5 {
        controller.volume_delta(4).await;
    }
    assert_eq!(zone.current_volume(), 100);

    for _ in 0..30 {
        controller.volume_delta(-5).await;
    }
    assert_eq!(zone.current_volume(), 0);
}
