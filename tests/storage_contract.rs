//! Storage contract
//!
//! One suite, every backend. Each case runs through `ShipLogic` against a
//! fresh store driven by a simulated clock, so the in-memory and SQLite
//! backends must agree on every observable behaviour.

use std::sync::Arc;

use ships::{
    Clock, MemoryStorage, NewShip, OrderBy, ShipField, ShipLogic, ShipQuery, ShipStatus, ShipStorage,
    Ship, ShipUpdate, SimClock, StorageError,
};

#[cfg(feature = "sqlite")]
use ships::SqliteStorage;

const USER_ID: u32 = 1;
const OTHER_USER_ID: u32 = 666;

fn goodship() -> NewShip {
    NewShip::new("GOODSHIP COTTON", "1234567", USER_ID)
}

async fn open_memory(clock: Arc<SimClock>) -> Arc<dyn ShipStorage> {
    Arc::new(MemoryStorage::with_clock(clock))
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(clock: Arc<SimClock>) -> Arc<dyn ShipStorage> {
    Arc::new(
        SqliteStorage::open_with_clock(":memory:", 1, clock)
            .await
            .expect("in-memory sqlite should open"),
    )
}

macro_rules! storage_contract {
    ($backend:ident => $open:path; $($case:ident),* $(,)?) => {
        mod $backend {
            use super::*;

            $(
                #[tokio::test]
                async fn $case() {
                    let clock = Arc::new(SimClock::new());
                    let logic = ShipLogic::new($open(clock.clone()).await);
                    contract::$case(&logic, &clock).await;
                    logic.storage().wipe().await.unwrap();
                }
            )*
        }
    };
}

storage_contract!(memory => open_memory;
    create_ship,
    create_ship_raises_duplicate_error,
    duplicate_slot_survives_soft_delete,
    same_imo_number_for_other_user,
    create_rejects_invalid_values,
    get_ships_by_user_newest_first,
    get_ships_filters,
    get_ships_order_by_name,
    update_ship,
    update_ship_clears_notes,
    update_non_existent_ship_raises_not_found,
    update_into_taken_slot_raises_duplicate,
    update_ship_user_id_is_ignored,
    update_rejects_resurrection,
    delete_ship,
    delete_non_existent_ship_raises_not_found,
    wipe_clears_everything,
);

#[cfg(feature = "sqlite")]
storage_contract!(sqlite => open_sqlite;
    create_ship,
    create_ship_raises_duplicate_error,
    duplicate_slot_survives_soft_delete,
    same_imo_number_for_other_user,
    create_rejects_invalid_values,
    get_ships_by_user_newest_first,
    get_ships_filters,
    get_ships_order_by_name,
    update_ship,
    update_ship_clears_notes,
    update_non_existent_ship_raises_not_found,
    update_into_taken_slot_raises_duplicate,
    update_ship_user_id_is_ignored,
    update_rejects_resurrection,
    delete_ship,
    delete_non_existent_ship_raises_not_found,
    wipe_clears_everything,
);

mod contract {
    use super::*;

    async fn count_all(logic: &ShipLogic) -> usize {
        logic.get_ships(&ShipQuery::new()).await.unwrap().1
    }

    pub async fn create_ship(logic: &ShipLogic, clock: &SimClock) {
        let actual = logic.create_ship(goodship()).await.unwrap();

        assert!(actual.id > 0);
        assert_eq!(actual.created, clock.now());
        assert_eq!(actual.modified, actual.created);
        assert_eq!(actual.status, ShipStatus::Active);
        assert_eq!(actual.name, "GOODSHIP COTTON");
        assert_eq!(actual.imo_number, "1234567");
        assert_eq!(actual.user_id, USER_ID);
        assert_eq!(actual.notes, None);
    }

    pub async fn create_ship_raises_duplicate_error(logic: &ShipLogic, _clock: &SimClock) {
        logic.create_ship(goodship()).await.unwrap();

        let err = logic.create_ship(goodship()).await.unwrap_err();

        assert!(matches!(
            err,
            StorageError::Duplicate { ref imo_number, user_id: USER_ID } if imo_number == "1234567"
        ));
        assert_eq!(count_all(logic).await, 1);
    }

    pub async fn duplicate_slot_survives_soft_delete(logic: &ShipLogic, _clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();
        logic.delete_ship(ship.id).await.unwrap();

        let err = logic.create_ship(goodship()).await.unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(count_all(logic).await, 1);
    }

    pub async fn same_imo_number_for_other_user(logic: &ShipLogic, _clock: &SimClock) {
        let mine = logic.create_ship(goodship()).await.unwrap();
        let theirs = logic
            .create_ship(NewShip::new("GOODSHIP COTTON", "1234567", OTHER_USER_ID))
            .await
            .unwrap();

        assert_ne!(mine.id, theirs.id);
        assert_eq!(count_all(logic).await, 2);
    }

    pub async fn create_rejects_invalid_values(logic: &ShipLogic, _clock: &SimClock) {
        for new in [
            NewShip::new("", "1234567", USER_ID),
            NewShip::new("x".repeat(128), "1234567", USER_ID),
            NewShip::new("GOODSHIP COTTON", "123", USER_ID),
            NewShip::new("GOODSHIP COTTON", "ABCDEFG", USER_ID),
            goodship().with_status(ShipStatus::Deleted),
        ] {
            let err = logic.create_ship(new).await.unwrap_err();
            assert!(matches!(err, StorageError::Invalid(_)), "unexpected error: {err}");
        }
        assert_eq!(count_all(logic).await, 0);
    }

    pub async fn get_ships_by_user_newest_first(logic: &ShipLogic, clock: &SimClock) {
        let mut data = goodship();
        let mut newest = logic.create_ship(data.clone()).await.unwrap();

        // Nine more for the same user, one millisecond apart.
        for index in 0..9 {
            clock.advance_ms(1);
            data.imo_number = format!("765432{index}");
            newest = logic.create_ship(data.clone()).await.unwrap();
        }

        // One for somebody else, which must not show up.
        clock.advance_ms(1);
        data.user_id = OTHER_USER_ID;
        logic.create_ship(data).await.unwrap();

        let (ships, total_count) = logic
            .get_ships(
                &ShipQuery::new()
                    .user_ids([USER_ID])
                    .order_by(OrderBy::desc(ShipField::Created)),
            )
            .await
            .unwrap();

        assert_eq!(total_count, 10);
        assert_eq!(ships.len(), 10);
        assert_eq!(ships[0], newest);
        assert!(ships.iter().all(|s| s.user_id == USER_ID));
        assert!(ships.windows(2).all(|w| w[0].created >= w[1].created));
    }

    pub async fn get_ships_filters(logic: &ShipLogic, _clock: &SimClock) {
        let a = logic.create_ship(goodship()).await.unwrap();
        let b = logic
            .create_ship(NewShip::new("BRAVO", "2222222", USER_ID))
            .await
            .unwrap();
        let c = logic
            .create_ship(NewShip::new("CHARLIE", "3333333", OTHER_USER_ID))
            .await
            .unwrap();
        logic.delete_ship(b.id).await.unwrap();

        // Soft-deleted ships are still listed for their owner.
        let (ships, count) = logic
            .get_ships(&ShipQuery::new().user_ids([USER_ID]))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(ships.len(), count);

        // Unless the status filter excludes them.
        let (ships, count) = logic
            .get_ships(&ShipQuery::new().user_ids([USER_ID]).status(ShipStatus::Active))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(ships[0].id, a.id);

        let (ships, _) = logic
            .get_ships(&ShipQuery::new().status(ShipStatus::Deleted))
            .await
            .unwrap();
        assert_eq!(ships.iter().map(|s| s.id).collect::<Vec<_>>(), vec![b.id]);

        // ids is a membership test, ANDed with the other filters.
        let (ships, count) = logic
            .get_ships(&ShipQuery::new().ids([a.id, c.id]))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(ships.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id, c.id]);

        let (_, count) = logic
            .get_ships(&ShipQuery::new().ids([a.id, c.id]).user_ids([OTHER_USER_ID]))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (_, count) = logic
            .get_ships(&ShipQuery::new().id(a.id).ids([c.id]))
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Several owners at once.
        let (_, count) = logic
            .get_ships(&ShipQuery::new().user_ids([USER_ID, OTHER_USER_ID]))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    pub async fn get_ships_order_by_name(logic: &ShipLogic, _clock: &SimClock) {
        for (name, imo_number) in [("CHARLIE", "3333333"), ("ALPHA", "1111111"), ("BRAVO", "2222222")] {
            logic
                .create_ship(NewShip::new(name, imo_number, USER_ID))
                .await
                .unwrap();
        }

        let names = |ships: Vec<Ship>| ships.into_iter().map(|s| s.name).collect::<Vec<_>>();

        let (ships, _) = logic
            .get_ships(&ShipQuery::new().order_by("name".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(names(ships), vec!["ALPHA", "BRAVO", "CHARLIE"]);

        let (ships, _) = logic
            .get_ships(&ShipQuery::new().order_by("-name".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(names(ships), vec!["CHARLIE", "BRAVO", "ALPHA"]);

        // No ordering requested: creation order.
        let (ships, _) = logic.get_ships(&ShipQuery::new()).await.unwrap();
        assert_eq!(names(ships), vec!["CHARLIE", "ALPHA", "BRAVO"]);
    }

    pub async fn update_ship(logic: &ShipLogic, clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();
        clock.advance_ms(1_000);

        let expected = logic
            .update_ship(ship.id, ShipUpdate::new().notes("Here are some fun notes"))
            .await
            .unwrap();

        let (ships, count) = logic.get_ships(&ShipQuery::new().id(ship.id)).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(ships[0].notes.as_deref(), Some("Here are some fun notes"));
        assert_eq!(ships[0], expected);
        assert_eq!(expected.created, ship.created);
        assert!(expected.modified > ship.modified);
    }

    pub async fn update_ship_clears_notes(logic: &ShipLogic, _clock: &SimClock) {
        let ship = logic
            .create_ship(goodship().with_notes("temporary"))
            .await
            .unwrap();

        let updated = logic
            .update_ship(ship.id, ShipUpdate::new().clear_notes().name("RENAMED"))
            .await
            .unwrap();

        assert_eq!(updated.notes, None);
        assert_eq!(updated.name, "RENAMED");
    }

    pub async fn update_non_existent_ship_raises_not_found(logic: &ShipLogic, _clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();

        let err = logic
            .update_ship(1_234_567_889_999, ShipUpdate::new().notes("Not found bud!"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound { id: 1_234_567_889_999 }));
        let (ships, count) = logic.get_ships(&ShipQuery::new()).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(ships[0], ship);
    }

    pub async fn update_into_taken_slot_raises_duplicate(logic: &ShipLogic, clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();
        logic
            .create_ship(NewShip::new("BRAVO", "7654321", USER_ID))
            .await
            .unwrap();
        clock.advance_ms(1_000);

        let err = logic
            .update_ship(ship.id, ShipUpdate::new().imo_number("7654321").name("RENAMED"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Duplicate { ref imo_number, user_id: USER_ID } if imo_number == "7654321"
        ));
        let (ships, _) = logic.get_ships(&ShipQuery::new().id(ship.id)).await.unwrap();
        assert_eq!(ships[0], ship);

        // The slot it tried to leave is still held.
        assert!(logic.create_ship(goodship()).await.unwrap_err().is_duplicate());
    }

    pub async fn update_ship_user_id_is_ignored(logic: &ShipLogic, _clock: &SimClock) {
        let expected = logic.create_ship(goodship()).await.unwrap();

        let actual = logic
            .update_ship(expected.id, ShipUpdate::new().user_id(1234))
            .await
            .unwrap();

        assert_eq!(actual.user_id, expected.user_id);
        let (_, count) = logic
            .get_ships(&ShipQuery::new().user_ids([1234]))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    pub async fn update_rejects_resurrection(logic: &ShipLogic, clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();
        let deleted = logic.delete_ship(ship.id).await.unwrap();
        clock.advance_ms(1_000);

        let err = logic
            .update_ship(ship.id, ShipUpdate::new().status(ShipStatus::Active).notes("back"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Invalid(_)));
        let (ships, _) = logic.get_ships(&ShipQuery::new().id(ship.id)).await.unwrap();
        assert_eq!(ships[0], deleted);
    }

    pub async fn delete_ship(logic: &ShipLogic, _clock: &SimClock) {
        let ship = logic.create_ship(goodship()).await.unwrap();

        let actual = logic.delete_ship(ship.id).await.unwrap();
        assert_eq!(actual.status, ShipStatus::Deleted);

        let (ships, count) = logic.get_ships(&ShipQuery::new().id(ship.id)).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(ships[0].status, ShipStatus::Deleted);

        // Deleting again is harmless.
        let again = logic.delete_ship(ship.id).await.unwrap();
        assert!(again.is_deleted());
    }

    pub async fn delete_non_existent_ship_raises_not_found(logic: &ShipLogic, _clock: &SimClock) {
        let err = logic.delete_ship(42).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(count_all(logic).await, 0);
    }

    pub async fn wipe_clears_everything(logic: &ShipLogic, _clock: &SimClock) {
        logic.create_ship(goodship()).await.unwrap();
        logic
            .create_ship(NewShip::new("BRAVO", "2222222", OTHER_USER_ID))
            .await
            .unwrap();

        logic.storage().wipe().await.unwrap();

        assert_eq!(count_all(logic).await, 0);
        // The uniqueness slot is free again after a wipe.
        assert!(logic.create_ship(goodship()).await.is_ok());
    }
}
