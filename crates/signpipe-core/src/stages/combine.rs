//! CombineResults: sort everything, join with `_`, emit once

use crate::channel::{Inbox, Outbox};
use crate::pipeline::Stage;

pub const COMBINE_SEPARATOR: &str = "_";

/// Sort ascending by bytes and join with [`COMBINE_SEPARATOR`].
pub fn combine(mut parts: Vec<String>) -> String {
    parts.sort_unstable();
    parts.join(COMBINE_SEPARATOR)
}

/// Collects the whole input and emits exactly one combined item.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombineResults;

impl Stage for CombineResults {
    fn name(&self) -> &str {
        "combine"
    }

    fn run(&self, input: Inbox, output: Outbox) {
        let parts: Vec<String> = input.collect();
        let count = parts.len();
        let result = combine(parts);
        log::debug!("combine: {count} items -> {result}");
        if output.send(result).is_err() {
            log::warn!("combine: result dropped, sink closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_string() {
        assert_eq!(combine(Vec::new()), "");
    }

    #[test]
    fn single_item_has_no_separator() {
        assert_eq!(combine(vec!["abc".into()]), "abc");
    }

    #[test]
    fn byte_order_not_numeric() {
        let parts = vec!["10".into(), "9".into(), "1".into(), "B".into(), "a".into()];
        assert_eq!(combine(parts), "1_10_9_B_a");
    }
}
