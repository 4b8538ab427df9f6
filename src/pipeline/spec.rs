// src/pipeline/spec.rs

use crate::errors::{PackpipeError, Result};
use crate::stage::{StageSpec, StdinSource, StdoutSink};

/// Validated, ordered list of stages.
///
/// Invariants checked by [`PipelineSpec::new`]:
/// - at least one stage;
/// - every interior boundary is `StdoutSink::Pipe` → `StdinSource::Pipe`;
/// - the first stage does not read from a pipe and the last stage does
///   not write into one (there is nobody on the other side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    stages: Vec<StageSpec>,
}

impl PipelineSpec {
    pub fn new(stages: Vec<StageSpec>) -> Result<Self> {
        validate_stages(&stages)?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn validate_stages(stages: &[StageSpec]) -> Result<()> {
    let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
        return Err(PackpipeError::InvalidPipeline(
            "pipeline must contain at least one stage".to_string(),
        ));
    };

    if *first.stdin_source() == StdinSource::Pipe {
        return Err(PackpipeError::InvalidPipeline(format!(
            "first stage '{}' reads from a pipe but has no predecessor",
            first.engine()
        )));
    }

    if *last.stdout_sink() == StdoutSink::Pipe {
        return Err(PackpipeError::InvalidPipeline(format!(
            "last stage '{}' writes into a pipe but has no successor",
            last.engine()
        )));
    }

    for (idx, pair) in stages.windows(2).enumerate() {
        let (producer, consumer) = (&pair[0], &pair[1]);
        if *producer.stdout_sink() != StdoutSink::Pipe {
            return Err(PackpipeError::InvalidPipeline(format!(
                "stage {} ('{}') must write into a pipe to feed stage {} ('{}')",
                idx,
                producer.engine(),
                idx + 1,
                consumer.engine()
            )));
        }
        if *consumer.stdin_source() != StdinSource::Pipe {
            return Err(PackpipeError::InvalidPipeline(format!(
                "stage {} ('{}') must read from the pipe of stage {} ('{}')",
                idx + 1,
                consumer.engine(),
                idx,
                producer.engine()
            )));
        }
    }

    Ok(())
}
