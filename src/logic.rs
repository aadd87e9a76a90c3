use crate::stack::Stack;

/// Bookkeeping for one open `when` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicState {
    /// The branch currently open in this chain must be suppressed.
    pub ignoring: bool,
    /// Some branch of this chain has already matched, so every later branch
    /// is suppressed.
    pub already_passed: bool,
    /// Scopes opened while this chain is the innermost one and not yet
    /// closed. The `end` that arrives at depth zero closes the chain itself.
    pub depth: usize,
}

/// A partial update applied to the innermost [`LogicState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicPatch {
    pub ignoring: Option<bool>,
    pub already_passed: Option<bool>,
}

impl LogicPatch {
    /// Suppress the branch being opened.
    pub const fn ignore() -> Self {
        Self {
            ignoring: Some(true),
            already_passed: None,
        }
    }

    /// Open the branch and mark the chain as matched.
    pub const fn pass() -> Self {
        Self {
            ignoring: Some(false),
            already_passed: Some(true),
        }
    }

    fn apply(self, state: &mut LogicState) {
        if let Some(ignoring) = self.ignoring {
            state.ignoring = ignoring;
        }
        if let Some(already_passed) = self.already_passed {
            state.already_passed = already_passed;
        }
    }
}

/// Global predicates derived from the whole logic stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicFlags {
    /// At least one chain is open.
    pub active: bool,
    /// Some open chain is suppressing its current branch.
    pub ignoring: bool,
}

/// Folds the logic stack into its global flags.
///
/// An outer suppressed branch suppresses everything nested in it, whatever the
/// inner chains decided.
pub fn reduce(states: &[LogicState]) -> LogicFlags {
    LogicFlags {
        active: !states.is_empty(),
        ignoring: states.iter().any(|state| state.ignoring),
    }
}

/// What a call to `end` resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndAction {
    /// Close the innermost open element.
    PopElement,
    /// A suppressed scope was closed; nothing was ever pushed for it.
    Skip,
    /// The `end` closed a whole `when` chain.
    ExitedChain,
}

/// The conditional state machine behind `when`, `else_when` and `otherwise`.
///
/// Flags are never written directly: every mutation goes through the stack and
/// is followed by a single [`reduce`].
#[derive(Debug, Clone, Default)]
pub struct Logic {
    states: Stack<LogicState>,
    flags: LogicFlags,
}

impl Logic {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn active(&self) -> bool {
        self.flags.active
    }

    pub const fn ignoring(&self) -> bool {
        self.flags.ignoring
    }

    pub const fn flags(&self) -> LogicFlags {
        self.flags
    }

    /// Number of open chains.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn top(&self) -> Option<&LogicState> {
        self.states.top()
    }

    /// Opens a new chain whose first branch is taken iff `condition`.
    pub fn enter(&mut self, condition: bool) {
        self.states.push(LogicState {
            ignoring: !condition,
            already_passed: condition,
            depth: 0,
        });
        self.recompute();
    }

    /// Merges `patch` into the innermost chain. Does nothing when no chain is open.
    pub fn update(&mut self, patch: LogicPatch) {
        if let Some(state) = self.states.top_mut() {
            patch.apply(state);
        }
        self.recompute();
    }

    /// Drops the innermost chain.
    pub fn exit(&mut self) -> Option<LogicState> {
        let state = self.states.pop();
        self.recompute();
        state
    }

    /// Moves the innermost chain on to its next branch.
    ///
    /// Once a chain has matched, every later branch stays suppressed whatever
    /// its condition. Returns `false` when there is no chain to continue.
    pub fn branch(&mut self, condition: bool) -> bool {
        let Some(state) = self.states.top() else {
            return false;
        };

        let patch = if !state.already_passed && condition {
            LogicPatch::pass()
        } else {
            LogicPatch::ignore()
        };
        self.update(patch);
        true
    }

    /// Counts a scope opened under the innermost chain.
    pub fn descend(&mut self) {
        if let Some(state) = self.states.top_mut() {
            state.depth = state.depth.saturating_add(1);
        }
    }

    /// Counts a scope closed under the chain at `level` (1 being the outermost).
    pub(crate) fn ascend_at(&mut self, level: usize) {
        let Some(index) = level.checked_sub(1) else {
            return;
        };
        if let Some(state) = self.states.get_mut(index) {
            state.depth = state.depth.saturating_sub(1);
        }
    }

    /// Resolves an `end` call against the innermost chain.
    pub(crate) fn end(&mut self) -> EndAction {
        let Some(depth) = self.states.top().map(|state| state.depth) else {
            return EndAction::PopElement;
        };

        if depth == 0 {
            self.exit();
            return EndAction::ExitedChain;
        }

        if let Some(state) = self.states.top_mut() {
            state.depth = depth.saturating_sub(1);
        }

        if self.flags.ignoring {
            EndAction::Skip
        } else {
            EndAction::PopElement
        }
    }

    fn recompute(&mut self) {
        self.flags = reduce(self.states.as_slice());
    }
}
