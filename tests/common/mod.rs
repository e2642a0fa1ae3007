//! Shared test doubles

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use flowlab::{
    error::{EngineError, Result},
    simulation::{KernelArgs, LatticeBackend},
};

/// One recorded kernel invocation. Buffers are identified by allocation id.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize { dist_out: usize },
    SolidMask { mask_out: usize },
    CollideStream {
        dist_in: usize,
        mask_in: usize,
        dist_out: usize,
        speed_out: usize,
    },
    Boundary { dist: usize },
    /// Recorded by a test in place of real render work.
    Draw { source: usize },
}

/// Backend that runs nothing and logs every submitted kernel call.
#[derive(Default)]
pub struct RecordingBackend {
    allocations: RefCell<Vec<(&'static str, u64)>>,
    fail_on_allocation: Option<usize>,
    attempts: Cell<usize>,
    submitted: RefCell<Vec<Call>>,
    waits: Cell<usize>,
    last_args: Cell<Option<KernelArgs>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the allocation attempt with the given zero-based index.
    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on_allocation: Some(attempt),
            ..Self::default()
        }
    }

    pub fn allocations(&self) -> Vec<(&'static str, u64)> {
        self.allocations.borrow().clone()
    }

    /// Drain the calls submitted so far.
    pub fn take_calls(&self) -> Vec<Call> {
        self.submitted.borrow_mut().drain(..).collect()
    }

    pub fn waits(&self) -> usize {
        self.waits.get()
    }

    pub fn last_args(&self) -> Option<KernelArgs> {
        self.last_args.get()
    }

    fn record(&self, stream: &mut Vec<Call>, args: &KernelArgs, call: Call) {
        self.last_args.set(Some(*args));
        stream.push(call);
    }
}

impl LatticeBackend for RecordingBackend {
    type Buffer = usize;
    type Stream = Vec<Call>;

    fn name(&self) -> &str {
        "recording"
    }

    fn allocate(&self, label: &'static str, bytes: u64) -> Result<usize> {
        let attempt = self.attempts.get();
        self.attempts.set(attempt + 1);
        if self.fail_on_allocation == Some(attempt) {
            return Err(EngineError::Allocation { label, bytes });
        }
        let mut allocations = self.allocations.borrow_mut();
        allocations.push((label, bytes));
        Ok(allocations.len() - 1)
    }

    fn buffer_size(&self, buffer: &usize) -> u64 {
        self.allocations.borrow()[*buffer].1
    }

    fn begin(&self, _label: &str) -> Vec<Call> {
        Vec::new()
    }

    fn submit(&self, stream: Vec<Call>) {
        self.submitted.borrow_mut().extend(stream);
    }

    fn submit_and_wait(&self, stream: Vec<Call>) {
        self.submit(stream);
        self.waits.set(self.waits.get() + 1);
    }

    fn initialize(&self, stream: &mut Vec<Call>, args: &KernelArgs, dist_out: &usize) {
        self.record(stream, args, Call::Initialize { dist_out: *dist_out });
    }

    fn solid_mask(&self, stream: &mut Vec<Call>, args: &KernelArgs, mask_out: &usize) {
        self.record(stream, args, Call::SolidMask { mask_out: *mask_out });
    }

    fn collide_stream(
        &self,
        stream: &mut Vec<Call>,
        args: &KernelArgs,
        dist_in: &usize,
        mask_in: &usize,
        dist_out: &usize,
        speed_out: &usize,
    ) {
        self.record(
            stream,
            args,
            Call::CollideStream {
                dist_in: *dist_in,
                mask_in: *mask_in,
                dist_out: *dist_out,
                speed_out: *speed_out,
            },
        );
    }

    fn boundary(&self, stream: &mut Vec<Call>, args: &KernelArgs, dist: &usize) {
        self.record(stream, args, Call::Boundary { dist: *dist });
    }

    fn read_words(&self, buffer: &usize) -> Result<Vec<u32>> {
        Ok(vec![0; (self.buffer_size(buffer) / 4) as usize])
    }
}
