//! Banned address tracking.

use std::collections::HashMap;
use std::net::IpAddr;

use crate::domain::Timestamp;

#[derive(Debug, Clone)]
struct BannedEntry {
    banned_until: Timestamp,
    reason: &'static str,
}

/// Tracks banned addresses with expiration times
#[derive(Debug, Clone, Default)]
pub struct BannedAddresses {
    entries: HashMap<IpAddr, BannedEntry>,
}

impl BannedAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or extend a ban
    pub fn ban(&mut self, address: IpAddr, until: Timestamp, reason: &'static str) {
        let entry = self.entries.entry(address).or_insert(BannedEntry {
            banned_until: until,
            reason,
        });
        if until > entry.banned_until {
            entry.banned_until = until;
            entry.reason = reason;
        }
    }

    /// Check if an address is currently banned.
    pub fn is_banned(&self, address: &IpAddr, now: Timestamp) -> bool {
        self.entries
            .get(address)
            .is_some_and(|entry| entry.banned_until > now)
    }

    pub fn reason(&self, address: &IpAddr) -> Option<&'static str> {
        self.entries.get(address).map(|e| e.reason)
    }

    /// Remove expired bans
    pub fn gc_expired(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.banned_until > now);
        before - self.entries.len()
    }

    /// Get count of active bans
    pub fn count(&self, now: Timestamp) -> usize {
        self.entries
            .values()
            .filter(|e| e.banned_until > now)
            .count()
    }
}
