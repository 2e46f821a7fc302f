//! Compile-append-run coordination for interactive use.
//!
//! Lines accumulate until they compile; a fragment whose only diagnostics
//! are `UnexpectedEndOfStream` is incomplete rather than wrong, so the
//! caller keeps prompting for more.

use isb_bytecode::Value;

use crate::Engine;

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentOutcome {
    /// Ran cleanly and left a value on the stack; it has been popped.
    Value(Value),
    /// Ran cleanly with nothing on the stack.
    Done,
    /// The fragment is incomplete; feed more lines.
    NeedMoreLines,
    /// The fragment failed to compile and was dropped.
    CompileError,
    /// The fragment compiled but failed at runtime; engine state is kept.
    RuntimeError,
}

pub struct Incremental {
    engine: Engine,
    buffer: String,
}

impl Incremental {
    pub fn new(name: impl Into<String>) -> Self {
        Self { engine: Engine::new(name), buffer: String::new() }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// True when lines are buffered awaiting the rest of a statement.
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop the accumulated buffer and all engine state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.engine.reset();
    }

    pub fn feed(&mut self, line: &str) -> FragmentOutcome {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
        let fragment = self.buffer.clone();

        if !self.engine.compile(&fragment, true) {
            if self.engine.diagnostics().only_end_of_stream() {
                return FragmentOutcome::NeedMoreLines;
            }
            self.buffer.clear();
            return FragmentOutcome::CompileError;
        }
        self.buffer.clear();

        if !self.engine.run(true) {
            return FragmentOutcome::RuntimeError;
        }
        if self.engine.stack_count() > 0 {
            match self.engine.stack_pop() {
                Some(v) => FragmentOutcome::Value(v),
                None => FragmentOutcome::Done,
            }
        } else {
            FragmentOutcome::Done
        }
    }
}
