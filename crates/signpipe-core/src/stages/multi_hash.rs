//! MultiHash: six index-tagged `hash2` calls concatenated in index order

use std::thread;

use crate::channel::{Inbox, Outbox};
use crate::pipeline::Stage;
use crate::signer::SigningContext;

use super::workers::{DEFAULT_MAX_IN_FLIGHT, current_name, fan_out};

/// Number of parallel `hash2` rounds per item
pub const MULTI_HASH_ROUNDS: usize = 6;

/// Computes `hash2("0" + data) + … + hash2("5" + data)` per item.
///
/// The rounds run in parallel and may finish in any order. Round `i` writes
/// only slot `i`; the slots are concatenated after all rounds joined. At most
/// `max_in_flight` items are hashed at once, so at most
/// `max_in_flight * MULTI_HASH_ROUNDS` rounds are alive.
#[derive(Debug, Clone)]
pub struct MultiHash {
    ctx: SigningContext,
    max_in_flight: usize,
}

impl MultiHash {
    pub fn new(ctx: SigningContext) -> Self {
        Self {
            ctx,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Cap the number of items hashed at once (at least one).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn digest(&self, data: &str) -> String {
        let round = |th: usize| self.ctx.hash2(&format!("{th}{data}"));
        let parent = current_name("multi_hash");
        let mut slots: [String; MULTI_HASH_ROUNDS] = Default::default();
        let mut unspawned = Vec::new();

        thread::scope(|s| {
            for (th, slot) in slots.iter_mut().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("{parent}.{th}"))
                    .spawn_scoped(s, move || {
                        *slot = round(th);
                        log::debug!("{data} multi_hash hash2(th+data) {th} {slot}");
                    });
                if let Err(e) = spawned {
                    log::error!("{parent}: round {th} failed to spawn, running inline: {e}");
                    unspawned.push(th);
                }
            }
        });
        for th in unspawned {
            slots[th] = round(th);
        }
        slots.concat()
    }
}

impl Stage for MultiHash {
    fn name(&self) -> &str {
        "multi_hash"
    }

    fn run(&self, input: Inbox, output: Outbox) {
        fan_out(self.name(), self.max_in_flight, input, &output, |data| self.digest(data));
    }
}
