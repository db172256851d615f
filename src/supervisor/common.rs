// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::future::Future;

/// The outcome of one state's `step`: move to a new state, stay put, or end
/// the run loop, each carrying a result the caller inspects before acting.
pub enum Transition<S, R> {
    Next(S, R),
    Stay(R),
    Done(R),
}

/// One state in an explicit state machine: `step` consumes `&mut self` and
/// the shared context, returning a boxed future so implementors can await
/// across the transition.
pub trait StateMachine<Ctx, RespCtx>: Sized {
    type StepResult<'a>: Future<Output = RespCtx> + Send + 'a
    where
        Self: 'a,
        RespCtx: 'a,
        Ctx: 'a;

    fn step<'a>(&'a mut self, ctx: &'a mut Ctx) -> Self::StepResult<'a>;
}
