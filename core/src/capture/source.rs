use crate::prelude::CoreResult;
use std::collections::VecDeque;

/// Producer of raw detected-name batches (OCR pass, DOM scrape, replay file).
///
/// `capture` may block; the session runs it on a blocking thread.
pub trait CaptureSource: Send {
    fn capture(&mut self) -> CoreResult<Vec<String>>;
}

impl CaptureSource for Box<dyn CaptureSource> {
    fn capture(&mut self) -> CoreResult<Vec<String>> {
        (**self).capture()
    }
}

/// Replays prepared batches in order, then yields empty batches.
#[derive(Debug, Clone, Default)]
pub struct QueueSource {
    batches: VecDeque<Vec<String>>,
}

impl QueueSource {
    pub fn new<I, B, S>(batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            batches: batches
                .into_iter()
                .map(|batch| batch.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl CaptureSource for QueueSource {
    fn capture(&mut self) -> CoreResult<Vec<String>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

/// Adapts a closure into a capture source.
pub struct FnSource<F>(pub F);

impl<F> CaptureSource for FnSource<F>
where
    F: FnMut() -> CoreResult<Vec<String>> + Send,
{
    fn capture(&mut self) -> CoreResult<Vec<String>> {
        (self.0)()
    }
}
