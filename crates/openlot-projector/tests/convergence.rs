//! A live follower and a replay from genesis must converge to the same view,
//! and that view must agree with the authoritative ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use openlot_projector::{ViewProjector, ViewStatus, compute_view_root, follow};
use openlot_settlement::{ExecutionEnvironment, LedgerHandle, LedgerService, ManualClock};
use openlot_types::{
    Amount, AuctionId, EventSeq, Intent, ItemId, ItemStatus, MarketConfig, Resolution,
    SignedIntent, Wallet,
};
use tokio::sync::RwLock;

fn tokens(n: u64) -> Amount {
    Amount(n * 1_000_000)
}

async fn submit(handle: &LedgerHandle, signed: SignedIntent) {
    handle.submit(signed).await.unwrap();
}

async fn wait_for(projector: &RwLock<ViewProjector>, seq: EventSeq) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while projector.read().await.next_seq() < seq {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn follower_and_replay_converge_with_ledger() {
    let clock = ManualClock::new(Utc::now());
    let env = ExecutionEnvironment::with_clock(MarketConfig::default(), clock.clone()).unwrap();
    let (handle, service) = LedgerService::spawn(env);

    let seller = Wallet::generate();
    let alice = Wallet::generate();
    let bob = Wallet::generate();

    // Some history before the follower starts, so it has to catch up.
    for wallet in [&seller, &alice, &bob] {
        submit(&handle, wallet.sign(Intent::ClaimFaucet).unwrap()).await;
    }
    for n in 0..4 {
        submit(
            &handle,
            seller
                .sign(Intent::Mint { metadata_uri: format!("meta://{n}") })
                .unwrap(),
        )
        .await;
    }

    let live = Arc::new(RwLock::new(ViewProjector::new()));
    let follower = tokio::spawn(follow(handle.clone(), Arc::clone(&live)));

    submit(
        &handle,
        seller
            .sign(Intent::List { item_id: ItemId(1), price: tokens(100) })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        alice
            .sign(Intent::Buy { item_id: ItemId(1), max_payment: tokens(100) })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        seller
            .sign(Intent::CreateAuction {
                item_id: ItemId(2),
                reserve: tokens(50),
                duration_secs: 60,
            })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        alice
            .sign(Intent::Bid { auction_id: AuctionId(1), amount: tokens(60) })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        bob.sign(Intent::Bid { auction_id: AuctionId(1), amount: tokens(80) })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        seller
            .sign(Intent::List { item_id: ItemId(3), price: tokens(40) })
            .unwrap(),
    )
    .await;
    // An auction nobody bid on, pulled by its seller.
    submit(
        &handle,
        seller
            .sign(Intent::CreateAuction {
                item_id: ItemId(4),
                reserve: tokens(500),
                duration_secs: 60,
            })
            .unwrap(),
    )
    .await;
    submit(&handle, seller.sign(Intent::Unlist { item_id: ItemId(4) }).unwrap()).await;

    // Mid-auction view.
    let log = handle.events_since(EventSeq::GENESIS).await.unwrap();
    let head = log.last().unwrap().seq.next();
    wait_for(&live, head).await;
    {
        let view = live.read().await;
        assert_eq!(view.highest_bidder(ItemId(2)), Some(bob.account()));
        assert_eq!(view.deposit_of(AuctionId(1), alice.account()), tokens(60));
        assert_eq!(view.market_items().len(), 2);
        assert_eq!(view.listed_by(seller.account()).len(), 2);
        assert_eq!(
            view.top_sellers(),
            vec![(seller.account(), tokens(120))]
        );
    }

    clock.advance(TimeDelta::seconds(61));
    submit(
        &handle,
        alice
            .sign(Intent::CompleteAuction { auction_id: AuctionId(1) })
            .unwrap(),
    )
    .await;
    submit(
        &handle,
        alice
            .sign(Intent::WithdrawBid { auction_id: AuctionId(1) })
            .unwrap(),
    )
    .await;

    let log = handle.events_since(EventSeq::GENESIS).await.unwrap();
    let head = log.last().unwrap().seq.next();
    wait_for(&live, head).await;

    let replayed = ViewProjector::replay(&log).unwrap();
    let live_view = live.read().await.clone();
    assert_eq!(live_view, replayed);
    assert_eq!(compute_view_root(&live_view), compute_view_root(&replayed));

    // Every projected item agrees with the authoritative ledger.
    for view in replayed.items() {
        let item = handle.item(view.item_id).await.unwrap();
        assert_eq!(view.owner, item.owner);
        assert_eq!(view.creator, item.creator);
        match (&view.status, item.status) {
            (ViewStatus::Default, ItemStatus::Default) => {}
            (ViewStatus::Listed { price }, ItemStatus::Listed(listing)) => {
                assert_eq!(*price, listing.price);
            }
            (ViewStatus::Auctioned { auction_id, .. }, ItemStatus::Auctioned(id)) => {
                assert_eq!(*auction_id, id);
            }
            (projected, actual) => panic!("{projected:?} vs {actual:?}"),
        }
    }
    assert_eq!(replayed.item(ItemId(1)).unwrap().owner, alice.account());
    assert_eq!(replayed.item(ItemId(2)).unwrap().owner, bob.account());
    assert_eq!(replayed.deposit_of(AuctionId(1), alice.account()), Amount::ZERO);
    assert_eq!(replayed.market_items().len(), 1);

    let cancelled = replayed.auction(AuctionId(2)).unwrap();
    assert_eq!(cancelled.outcome, Some(Resolution::Cancelled));
    assert_eq!(
        handle.auction(AuctionId(2)).await.unwrap().resolution,
        Some(Resolution::Cancelled)
    );
    assert_eq!(replayed.item(ItemId(4)).unwrap().status, ViewStatus::Default);
    assert_eq!(replayed.item(ItemId(4)).unwrap().owner, seller.account());

    handle.shutdown().await.unwrap();
    service.await.unwrap();
    follower.await.unwrap().unwrap();
}

#[tokio::test]
async fn replay_is_restartable_from_any_point() {
    let env = ExecutionEnvironment::new(MarketConfig::default()).unwrap();
    let (handle, service) = LedgerService::spawn(env);
    let owner = Wallet::generate();
    for n in 0..5 {
        submit(
            &handle,
            owner
                .sign(Intent::Mint { metadata_uri: format!("meta://{n}") })
                .unwrap(),
        )
        .await;
    }
    submit(
        &handle,
        owner
            .sign(Intent::List { item_id: ItemId(4), price: tokens(9) })
            .unwrap(),
    )
    .await;

    let log = handle.events_since(EventSeq::GENESIS).await.unwrap();
    let full = ViewProjector::replay(&log).unwrap();

    // Half the log, then the whole log again from the start.
    let mut partial = ViewProjector::replay(&log[..3]).unwrap();
    for event in &log {
        partial.apply(event).unwrap();
    }
    assert_eq!(partial, full);

    // Feeding a suffix to a fresh projector is a gap.
    let mut fresh = ViewProjector::new();
    assert!(fresh.apply(&log[2]).is_err());
    assert_eq!(fresh.next_seq(), EventSeq::GENESIS);

    handle.shutdown().await.unwrap();
    service.await.unwrap();
}
