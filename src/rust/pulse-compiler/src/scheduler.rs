// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Merge of the per-channel timelines into one chronological event stream.
//!
//! Each channel is walked by a [`ChannelTimeline`], a pull iterator over its token
//! tree. Loop bodies are walked once; the hardware repeats them. Event times are
//! relative to the innermost enclosing loop entry, while the merge orders events
//! by their absolute time within one pass over the bodies.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pulse_dsl::{PulseName, Token};
use tproc_asm::Channel;

use crate::{Error, Result};

pub type LoopId = u32;

/// Duration lookup used to advance the channel cursors.
pub trait PulseDurations {
    fn duration_ns(&self, pulse: &PulseName) -> Result<u64>;
}

/// Mints loop ids, unique across all channels of a compile.
#[derive(Debug, Default)]
pub struct LoopIdAllocator {
    last: LoopId,
}

impl LoopIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> LoopId {
        self.last += 1;
        self.last
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Pulse(PulseName),
    LoopStart { id: LoopId, count: u32 },
    LoopEnd { id: LoopId, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEvent {
    pub channel: Channel,
    /// Nanoseconds since the entry of the innermost enclosing loop, or since the
    /// program start outside of loops.
    pub time: u64,
    /// Nanoseconds since program start, counting each loop body once.
    pub absolute: u64,
    pub kind: EventKind,
}

struct Frame<'a> {
    tokens: std::slice::Iter<'a, Token>,
    /// Loop the frame belongs to; `None` for the top level.
    loop_marker: Option<(LoopId, u32)>,
}

/// Pull iterator over the events of one channel.
pub struct ChannelTimeline<'a> {
    channel: Channel,
    frames: Vec<Frame<'a>>,
    /// Absolute time of the current frame's start.
    origin: u64,
    /// Time since the current frame's start.
    cursor: u64,
}

impl<'a> ChannelTimeline<'a> {
    pub fn new(channel: Channel, tokens: &'a [Token]) -> Self {
        Self {
            channel,
            frames: vec![Frame {
                tokens: tokens.iter(),
                loop_marker: None,
            }],
            origin: 0,
            cursor: 0,
        }
    }

    fn overflow(&self) -> Error {
        Error::Range(format!(
            "Timeline of channel {} exceeds {} ns",
            self.channel,
            u64::MAX
        ))
    }

    /// Move the cursor past `duration_ns`.
    fn advance(&mut self, duration_ns: u64) -> Result<()> {
        self.cursor = self
            .cursor
            .checked_add(duration_ns)
            .ok_or_else(|| self.overflow())?;
        Ok(())
    }

    fn absolute(&self) -> Result<u64> {
        self.origin
            .checked_add(self.cursor)
            .ok_or_else(|| self.overflow())
    }

    fn event(&self, kind: EventKind) -> Result<ScheduleEvent> {
        Ok(ScheduleEvent {
            channel: self.channel,
            time: self.cursor,
            absolute: self.absolute()?,
            kind,
        })
    }

    /// Start a new frame at the current cursor.
    fn rebase(&mut self) -> Result<()> {
        self.origin = self.absolute()?;
        self.cursor = 0;
        Ok(())
    }

    /// Advance to the next event; waits are consumed silently.
    pub fn next_event(
        &mut self,
        durations: &dyn PulseDurations,
        loop_ids: &mut LoopIdAllocator,
    ) -> Result<Option<ScheduleEvent>> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };
            match frame.tokens.next() {
                Some(Token::Wait(duration)) => self.advance(*duration)?,
                Some(Token::Pulse(name)) => {
                    let duration = durations.duration_ns(name)?;
                    let event = self.event(EventKind::Pulse(name.clone()))?;
                    self.advance(duration)?;
                    return Ok(Some(event));
                }
                Some(Token::Loop { count, body }) => {
                    let id = loop_ids.next_id();
                    let event = self.event(EventKind::LoopStart { id, count: *count })?;
                    self.rebase()?;
                    self.frames.push(Frame {
                        tokens: body.iter(),
                        loop_marker: Some((id, *count)),
                    });
                    return Ok(Some(event));
                }
                None => {
                    let finished = self.frames.pop();
                    if let Some((id, count)) = finished.and_then(|frame| frame.loop_marker) {
                        let event = self.event(EventKind::LoopEnd { id, count })?;
                        // Execution continues after one iteration of the body
                        self.rebase()?;
                        return Ok(Some(event));
                    }
                }
            }
        }
    }
}

/// Global, time ordered event stream over all channels.
///
/// Holds at most one pending event per channel. Ties are broken by the order in
/// which the channels were added. The iterator stops after the first error.
pub struct Scheduler<'a> {
    timelines: Vec<ChannelTimeline<'a>>,
    pending: Vec<Option<ScheduleEvent>>,
    queue: BinaryHeap<Reverse<(u64, usize)>>,
    durations: &'a dyn PulseDurations,
    loop_ids: LoopIdAllocator,
    primed: bool,
    failed: bool,
}

impl<'a> Scheduler<'a> {
    pub fn new<I>(channels: I, durations: &'a dyn PulseDurations) -> Self
    where
        I: IntoIterator<Item = (Channel, &'a [Token])>,
    {
        let timelines: Vec<_> = channels
            .into_iter()
            .map(|(channel, tokens)| ChannelTimeline::new(channel, tokens))
            .collect();
        let pending = vec![None; timelines.len()];
        Self {
            timelines,
            pending,
            queue: BinaryHeap::new(),
            durations,
            loop_ids: LoopIdAllocator::new(),
            primed: false,
            failed: false,
        }
    }

    /// Number of loop ids handed out so far.
    pub fn loops_started(&self) -> LoopId {
        self.loop_ids.last
    }

    fn refill(&mut self, index: usize) -> Result<()> {
        if let Some(event) =
            self.timelines[index].next_event(self.durations, &mut self.loop_ids)?
        {
            self.queue.push(Reverse((event.absolute, index)));
            self.pending[index] = Some(event);
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<ScheduleEvent>> {
        if !self.primed {
            self.primed = true;
            for index in 0..self.timelines.len() {
                self.refill(index)?;
            }
        }
        let Some(Reverse((_, index))) = self.queue.pop() else {
            return Ok(None);
        };
        let event = self.pending[index].take();
        self.refill(index)?;
        Ok(event)
    }
}

impl Iterator for Scheduler<'_> {
    type Item = Result<ScheduleEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(event) => event.map(Ok),
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
