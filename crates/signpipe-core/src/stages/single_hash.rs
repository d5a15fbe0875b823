//! SingleHash: `hash2(data) ~ hash2(hash1(data))` per item

use crate::channel::{Inbox, Outbox};
use crate::pipeline::Stage;
use crate::signer::SigningContext;

use super::workers::{DEFAULT_MAX_IN_FLIGHT, current_name, fan_out, join_pair};

/// Signs every item with one rate-limited `hash1` and two parallel `hash2`.
///
/// Each item gets its own worker thread, with at most `max_in_flight` alive.
/// Only the `hash1` call is serialized (through the context's rate token);
/// everything else runs in parallel.
#[derive(Debug, Clone)]
pub struct SingleHash {
    ctx: SigningContext,
    max_in_flight: usize,
}

impl SingleHash {
    pub fn new(ctx: SigningContext) -> Self {
        Self {
            ctx,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Cap the number of items signed at once (at least one).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Digest of a single item.
    pub fn sign(&self, data: &str) -> String {
        let md = self.ctx.hash1(data);
        log::debug!("{data} single_hash hash1(data) {md}");

        let helper = format!("{}.md", current_name("single_hash"));
        let (crc_md, crc) = join_pair(helper, || self.ctx.hash2(&md), || self.ctx.hash2(data));
        log::debug!("{data} single_hash hash2(hash1(data)) {crc_md}");
        log::debug!("{data} single_hash hash2(data) {crc}");

        format!("{crc}~{crc_md}")
    }
}

impl Stage for SingleHash {
    fn name(&self) -> &str {
        "single_hash"
    }

    fn run(&self, input: Inbox, output: Outbox) {
        fan_out(self.name(), self.max_in_flight, input, &output, |data| self.sign(data));
    }
}
