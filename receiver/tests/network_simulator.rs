//! Datagram-level network simulator for resilience tests.
//!
//! Applies seeded packet loss, duplication and reordering to encoded tone
//! datagrams so the receiver's loss accounting can be checked
//! deterministically.

#![allow(dead_code)]

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Network simulator configuration.
#[derive(Debug, Clone, Default)]
pub struct NetworkSimulatorConfig {
    // ---
    /// Packet loss rate (0.0 to 1.0)
    pub loss_rate: f64,

    /// Probability a delivered datagram is delivered twice
    pub duplicate_rate: f64,

    /// Probability a datagram overtakes one already in flight
    pub reorder_rate: f64,

    /// Random seed for deterministic testing
    pub seed: u64,
}

/// Network simulator statistics.
#[derive(Debug, Clone, Default)]
pub struct NetworkSimulatorStats {
    pub datagrams_sent: u64,
    pub datagrams_lost: u64,
    pub datagrams_duplicated: u64,
    pub datagrams_reordered: u64,
}

/// Lossy, duplicating, reordering channel for raw datagrams.
pub struct NetworkSimulator {
    // ---
    config: NetworkSimulatorConfig,
    rng: StdRng,
    in_flight: VecDeque<Vec<u8>>,
    stats: NetworkSimulatorStats,
}

impl NetworkSimulator {
    // ---
    pub fn new(config: NetworkSimulatorConfig) -> Self {
        // ---
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            in_flight: VecDeque::new(),
            stats: NetworkSimulatorStats::default(),
        }
    }

    /// Sends a datagram through the simulator.
    pub fn send(&mut self, datagram: Vec<u8>) {
        // ---
        self.stats.datagrams_sent += 1;

        if self.rng.gen_bool(self.config.loss_rate) {
            self.stats.datagrams_lost += 1;
            return;
        }

        if self.rng.gen_bool(self.config.duplicate_rate) {
            self.stats.datagrams_duplicated += 1;
            self.in_flight.push_back(datagram.clone());
        }

        if !self.in_flight.is_empty() && self.rng.gen_bool(self.config.reorder_rate) {
            self.stats.datagrams_reordered += 1;
            let pos = self.rng.gen_range(0..self.in_flight.len());
            self.in_flight.insert(pos, datagram);
        } else {
            self.in_flight.push_back(datagram);
        }
    }

    /// Delivers everything still in flight, in delivery order.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        // ---
        self.in_flight.drain(..).collect()
    }

    pub fn stats(&self) -> &NetworkSimulatorStats {
        &self.stats
    }
}
