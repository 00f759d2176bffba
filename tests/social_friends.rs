//! Accounts and friend lists on a sled store.

mod common;

use beyonder::sheet::SheetError;
use beyonder::social;

#[test]
fn friends_are_added_by_name_and_tag() {
    let (_tmp, store) = common::temp_store();
    let reg = common::fast_registry(&store);
    let klein = reg.register("klein", "tarot-club").unwrap();
    let audrey = reg.register("audrey", "justice-1").unwrap();

    assert!(matches!(
        reg.add_friend("klein", "audrey", if audrey.tag == "12345" { "54321" } else { "12345" }),
        Err(SheetError::NotFound(_))
    ));
    let me = reg.add_friend("klein", "Audrey", &audrey.tag).unwrap();
    assert_eq!(me.friends.len(), 1);
    assert_eq!(me.friends[0].to_string(), audrey.handle());

    // one-way: audrey's list is untouched
    assert!(reg.get("audrey").unwrap().friends.is_empty());

    assert!(matches!(
        reg.add_friend("klein", "audrey", &audrey.tag),
        Err(SheetError::AlreadyExists(_))
    ));
    assert!(matches!(
        reg.add_friend("klein", "klein", &klein.tag),
        Err(SheetError::InvalidInput(_))
    ));

    reg.remove_friend("klein", "AUDREY").unwrap();
    assert!(reg.get("klein").unwrap().friends.is_empty());
    assert!(reg.remove_friend("klein", "audrey").is_err());
}

#[test]
fn bad_tags_rejected_before_lookup() {
    let (_tmp, store) = common::temp_store();
    let reg = common::fast_registry(&store);
    reg.register("klein", "tarot-club").unwrap();
    for tag in ["", "1234", "123456", "abcde"] {
        assert!(matches!(
            reg.add_friend("klein", "audrey", tag),
            Err(SheetError::InvalidInput(_))
        ));
    }
}

#[test]
fn session_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("db");
    {
        let store = beyonder::storage::SledStore::open(&path).unwrap();
        social::login(&store, "klein").unwrap();
    }
    let store = beyonder::storage::SledStore::open(&path).unwrap();
    assert_eq!(social::current_user(&store).unwrap().as_deref(), Some("klein"));
}

#[test]
fn registry_lists_accounts_in_name_order() {
    let (_tmp, store) = common::temp_store();
    let reg = common::fast_registry(&store);
    assert!(reg.list().unwrap().is_empty());
    reg.register("Klein", "tarot-club").unwrap();
    reg.register("audrey", "justice-1").unwrap();
    social::login(&store, "klein").unwrap();

    let names: Vec<String> = reg.list().unwrap().into_iter().map(|p| p.username).collect();
    assert_eq!(names, vec!["audrey".to_string(), "Klein".to_string()]);
}
