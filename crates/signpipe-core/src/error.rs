//! Error type for pipeline construction and execution

/// Boxed error produced by a pipeline source
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Error from building or running a [`Pipeline`](crate::Pipeline).
#[derive(Debug)]
pub enum PipelineError {
    /// Pipeline was built with an empty stage list
    NoStages,
    /// Invalid executor settings (e.g. zero channel capacity)
    InvalidConfig(String),
    /// Source items could not be produced; no stage was started
    Source(SourceError),
    /// A runner thread could not be spawned
    Spawn(std::io::Error),
    /// A stage runner panicked
    StagePanicked { stage: String },
    /// Items were sent on an edge but never consumed
    ItemsLost { edge: String, lost: usize },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoStages => write!(f, "pipeline needs at least one stage"),
            Self::InvalidConfig(msg) => write!(f, "invalid pipeline config: {msg}"),
            Self::Source(e) => write!(f, "source failed: {e}"),
            Self::Spawn(e) => write!(f, "failed to spawn stage runner: {e}"),
            Self::StagePanicked { stage } => write!(f, "stage {stage} panicked"),
            Self::ItemsLost { edge, lost } => {
                write!(f, "{lost} items lost on edge {edge}")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e.as_ref()),
            Self::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Returned by [`Outbox::send`](crate::Outbox::send) when downstream hung up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

impl std::fmt::Display for Disconnected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "downstream channel closed")
    }
}

impl std::error::Error for Disconnected {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_no_stages() {
        let msg = PipelineError::NoStages.to_string();
        assert!(msg.contains("at least one stage"));
    }

    #[test]
    fn display_items_lost() {
        let err = PipelineError::ItemsLost {
            edge: "single_hash -> multi_hash".to_string(),
            lost: 3,
        };
        assert_eq!(err.to_string(), "3 items lost on edge single_hash -> multi_hash");
    }

    #[test]
    fn source_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "items.txt");
        let err = PipelineError::Source(Box::new(io));
        assert!(err.to_string().contains("items.txt"));
        assert!(err.source().is_some());
    }

    #[test]
    fn non_source_errors_have_no_cause() {
        let err = PipelineError::StagePanicked {
            stage: "combine".to_string(),
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "stage combine panicked");
    }
}
