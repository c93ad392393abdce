mod common;

use std::sync::Arc;
use std::thread;

use campaign_ledger::currency::Money;
use campaign_ledger::errors::CampaignError;
use campaign_ledger::ledger::PayoutMonth;
use common::{at, campaign_with_members, setup_manager, uid};

#[test]
fn racing_allocations_for_one_month_admit_a_single_winner() {
    let (_store, manager) = setup_manager();
    let names = ["admin", "m1", "m2", "m3", "m4", "m5", "m6", "m7"];
    let campaign = campaign_with_members(&manager, "admin", &names[1..], 8);
    let manager = Arc::new(manager);
    let march = PayoutMonth::new(2025, 3).unwrap();
    let campaign_id = campaign.id;

    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let manager = Arc::clone(&manager);
            let member = uid(name);
            thread::spawn(move || {
                manager.mutate(campaign_id, |agg| agg.allocate_month(&uid("admin"), &member, march))
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("allocation thread"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    let snapshot = manager.snapshot(campaign.id).unwrap();
    let winner = snapshot
        .members
        .iter()
        .find(|member| member.allocated_month == Some(march))
        .expect("one member holds march");
    for result in results.iter().filter_map(|result| result.as_ref().err()) {
        assert_eq!(result, &CampaignError::MonthAlreadyAllocated(winner.user_id().clone()));
    }
}

#[test]
fn concurrent_contributions_are_all_recorded() {
    let (store, manager) = setup_manager();
    let names = ["a", "b", "c", "d"];
    let campaign = campaign_with_members(&manager, "a", &names[1..], 4);
    let manager = Arc::new(manager);

    thread::scope(|scope| {
        for (idx, name) in names.iter().enumerate() {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                for day in 1..=5 {
                    manager
                        .mutate(campaign.id, |agg| {
                            agg.record_contribution(
                                &uid(name),
                                &uid(names[(idx + 1) % names.len()]),
                                Money::from_cents(1_000),
                                None,
                                at(2025, 2, day),
                            )
                        })
                        .expect("contribution");
                }
            });
        }
    });

    let snapshot = manager.snapshot(campaign.id).unwrap();
    assert_eq!(snapshot.contributions.len(), 20);
    assert_eq!(
        manager.read(campaign.id, |agg| agg.total_raised()).unwrap(),
        Money::from_cents(20_000)
    );
    let stored = campaign_ledger::storage::CampaignStore::fetch(store.as_ref(), campaign.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored, snapshot);
}
