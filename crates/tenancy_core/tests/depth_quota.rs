mod common;

use common::{fresh_env, saved_domain, saved_user};
use std::rc::Rc;
use tenancy_core::{Domain, Identity, User, UNLIMITED_DEPTH};

#[test]
fn genesis_user_has_unlimited_depth_everywhere() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let capped = saved_domain(&env, "capped", &genesis, &env.genesis_domain(), Some(0));

    assert_eq!(env.genesis_domain().depth_allowed(&env, &genesis), UNLIMITED_DEPTH);
    assert_eq!(capped.depth_allowed(&env, &genesis), UNLIMITED_DEPTH);
}

#[test]
fn inherited_quota_is_the_minimum_of_own_and_parent_minus_one() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let acme = saved_domain(&env, "acme", &genesis, &env.genesis_domain(), Some(2));
    let member = saved_user(&env, &acme);

    let team = Domain::create("team", Rc::clone(&member), Rc::clone(&acme)).unwrap();
    team.set_data("depth_allowed", "2").unwrap();
    assert!(team.save(&env, &member).unwrap());

    assert_eq!(acme.depth_allowed(&env, &member), 2);
    assert_eq!(team.depth_allowed(&env, &member), 1);
}

#[test]
fn unlimited_quota_propagates_down_the_chain() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let acme = saved_domain(&env, "acme", &genesis, &env.genesis_domain(), None);
    let member = saved_user(&env, &acme);
    let team = saved_domain(&env, "team", &member, &acme, None);
    let squad = saved_domain(&env, "squad", &member, &team, None);

    assert_eq!(acme.depth_allowed(&env, &member), UNLIMITED_DEPTH);
    assert_eq!(team.depth_allowed(&env, &member), UNLIMITED_DEPTH);
    assert_eq!(squad.depth_allowed(&env, &member), UNLIMITED_DEPTH);
}

#[test]
fn quota_shrinks_by_one_per_level_until_creation_stops() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let acme = saved_domain(&env, "acme", &genesis, &env.genesis_domain(), Some(3));
    let member = saved_user(&env, &acme);

    let mut origin = Rc::clone(&acme);
    for (name, expected_depth) in [("b", 2), ("c", 1), ("d", 0)] {
        let child = Domain::create(name, Rc::clone(&member), Rc::clone(&origin)).unwrap();
        assert!(child.save(&env, &member).unwrap(), "member creates {name}");
        assert_eq!(child.depth_allowed(&env, &member), expected_depth);
        origin = child;
    }

    let too_deep = Domain::create("e", Rc::clone(&member), Rc::clone(&origin)).unwrap();
    assert!(!too_deep.is_creatable(&env, &member));
    assert!(!too_deep.save(&env, &member).unwrap());
    assert_eq!(too_deep.id(), None);
}

#[test]
fn zero_quota_blocks_everyone_but_genesis() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let frozen = saved_domain(&env, "frozen", &genesis, &env.genesis_domain(), Some(0));
    let member = saved_user(&env, &frozen);

    assert_eq!(frozen.depth_allowed(&env, &member), 0);
    let blocked = Domain::create("blocked", Rc::clone(&member), Rc::clone(&frozen)).unwrap();
    assert!(!blocked.save(&env, &member).unwrap());

    let allowed = Domain::create("allowed", Rc::clone(&genesis), Rc::clone(&frozen)).unwrap();
    assert!(allowed.save(&env, &genesis).unwrap());
}

#[test]
fn users_registered_under_genesis_get_no_quota_without_rights() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let root = env.genesis_domain();
    let acme = saved_domain(&env, "acme", &genesis, &root, None);
    let drifter = saved_user(&env, &root);

    assert_eq!(root.depth_allowed(&env, &drifter), 0);
    assert_eq!(acme.depth_allowed(&env, &drifter), 0);
    let attempt = Domain::create("attempt", Rc::clone(&drifter), Rc::clone(&root)).unwrap();
    assert!(!attempt.save(&env, &drifter).unwrap());
}

#[test]
fn unparsable_quota_reads_as_unlimited() {
    let env = fresh_env();
    let genesis = env.genesis_user();
    let acme = saved_domain(&env, "acme", &genesis, &env.genesis_domain(), None);
    acme.set_data("depth_allowed", "plenty").unwrap();
    let member = User::create(Rc::clone(&acme));

    assert_eq!(acme.declared_depth_allowed(), UNLIMITED_DEPTH);
    assert_eq!(acme.depth_allowed(&env, &member), UNLIMITED_DEPTH);
}
