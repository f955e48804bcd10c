//! Tests for Misbehavior Scoring

use std::net::{IpAddr, Ipv4Addr};

use super::*;
use crate::domain::{NodeId, Timestamp};

fn addr(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

// =============================================================================
// TEST HELPERS
// =============================================================================

fn setup_scorer_with_node() -> (MisbehaviorScorer, NodeId, Timestamp) {
    let scorer = MisbehaviorScorer::new(MisbehaviorConfig::for_testing());
    let now = Timestamp::new(1000);
    let node = NodeId::new(1);
    scorer.on_peer_connected(node, addr(1), now);
    (scorer, node, now)
}

// =============================================================================
// TEST GROUP 1: Scoring
// =============================================================================

#[test]
fn test_new_peer_starts_at_zero() {
    let (scorer, node, _) = setup_scorer_with_node();
    assert_eq!(scorer.score(node), Some(0));
}

#[test]
fn test_invalid_signature_bans_immediately() {
    let (scorer, node, now) = setup_scorer_with_node();

    let outcome = scorer
        .misbehaving(node, Misbehavior::InvalidHandshakeSignature, now)
        .unwrap();

    assert_eq!(outcome.score, 100);
    assert!(outcome.banned);
    assert!(scorer.is_banned(&addr(1), now));
    assert_eq!(scorer.ban_reason(&addr(1)), Some("invalid-avahello-signature"));
}

#[test]
fn test_repeated_hello_costs_nothing() {
    let (scorer, node, now) = setup_scorer_with_node();

    let outcome = scorer
        .misbehaving(node, Misbehavior::RepeatedHello, now)
        .unwrap();

    assert_eq!(outcome.score, 0);
    assert!(!outcome.banned);
    assert!(!scorer.is_banned(&addr(1), now));
}

#[test]
fn test_ban_reported_once() {
    let (scorer, node, now) = setup_scorer_with_node();
    scorer.misbehaving(node, Misbehavior::BrokenDelegation, now);

    let again = scorer
        .misbehaving(node, Misbehavior::BrokenDelegation, now)
        .unwrap();
    assert!(!again.banned);
    assert_eq!(again.score, 200);
}

#[test]
fn test_unknown_peer_ignored() {
    let (scorer, _, now) = setup_scorer_with_node();
    assert!(scorer
        .misbehaving(NodeId::new(42), Misbehavior::InvalidHandshakeSignature, now)
        .is_none());
}

// =============================================================================
// TEST GROUP 2: Bans
// =============================================================================

#[test]
fn test_ban_outlives_connection() {
    let (scorer, node, now) = setup_scorer_with_node();
    scorer.misbehaving(node, Misbehavior::InvalidHandshakeSignature, now);
    scorer.on_peer_disconnected(node);

    assert_eq!(scorer.score(node), None);
    assert!(scorer.is_banned(&addr(1), now.add_secs(1)));
}

#[test]
fn test_ban_expires() {
    let (scorer, node, now) = setup_scorer_with_node();
    scorer.misbehaving(node, Misbehavior::InvalidHandshakeSignature, now);

    let later = now.add_secs(MisbehaviorConfig::for_testing().ban_duration_secs);
    assert!(!scorer.is_banned(&addr(1), later));
    assert_eq!(scorer.gc_expired(later), 1);
    assert_eq!(scorer.ban_count(later), 0);
}

#[test]
fn test_other_addresses_unaffected() {
    let (scorer, node, now) = setup_scorer_with_node();
    scorer.on_peer_connected(NodeId::new(2), addr(2), now);
    scorer.misbehaving(node, Misbehavior::InvalidHandshakeSignature, now);

    assert!(!scorer.is_banned(&addr(2), now));
    assert_eq!(scorer.score(NodeId::new(2)), Some(0));
}

#[test]
fn test_banned_addresses_extend_only() {
    let mut banned = BannedAddresses::new();
    banned.ban(addr(1), Timestamp::new(500), "first");
    banned.ban(addr(1), Timestamp::new(400), "second");

    assert!(banned.is_banned(&addr(1), Timestamp::new(450)));
    assert_eq!(banned.reason(&addr(1)), Some("first"));
}
