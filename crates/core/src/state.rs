//! The statement stepper: one transition rule per statement variant, turning the
//! current state into the next one. This is the machine's `step` relation.

use std::io::Write;
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{Expr, StmtId, StmtKind};
use crate::class::MethodDef;
use crate::context::MachineContext;
use crate::errors::{MachineError, MemberKind};
use crate::eval::{eval, THIS_REGISTER};
use crate::kont::{apply, handle, pop_handler, Applied, Handled, Kont};
use crate::pointer::{Addr, FramePointer};
use crate::store::Store;
use crate::value::Value;

/// A machine state: `(Control, Environment, Store, Kontinuation)`. `Environment`
/// here is just the current frame pointer -- every local name is an offset from it.
#[derive(Clone)]
pub struct State {
    pub control: StmtId,
    pub fp: FramePointer,
    pub store: Store,
    pub kont: Rc<Kont>,
}

impl State {
    pub fn new(control: StmtId, fp: FramePointer, store: Store, kont: Rc<Kont>) -> Self {
        State { control, fp, store, kont }
    }
}

/// The result of a single `step`. Exactly one of these four things happens.
pub enum StepResult {
    /// Execution continues at the new state.
    Next(State),
    /// A `return` reached `Halt`: normal termination.
    NormalHalt { value: Value, store: Store },
    /// A `throw` reached `Halt` with no matching handler.
    UncaughtException { exception: Value, store: Store },
    /// The current statement's successor is absent and no continuation resumes it:
    /// the body "fell off the end" without an explicit `return`.
    FellOff { store: Store },
}

/// Advances control to `next`, or reports falling off the end if there is none.
fn advance(next: Option<StmtId>, state: State) -> Result<StepResult, MachineError> {
    match next {
        Some(control) => Ok(StepResult::Next(State { control, ..state })),
        None => Ok(StepResult::FellOff { store: state.store }),
    }
}

pub fn step(state: State, ctx: &MachineContext, out: &mut dyn Write) -> Result<StepResult, MachineError> {
    let node = ctx.stmts.get(state.control);
    trace!("step {:?} at {:?}", node.kind, state.fp);

    match &node.kind {
        StmtKind::Skip | StmtKind::Label(_) => advance(node.next, state),

        StmtKind::Goto(label) => {
            let target = ctx.resolve_label(label)?;
            Ok(StepResult::Next(State { control: target, ..state }))
        }

        StmtKind::If(cond, label) => {
            let value = eval(cond, state.fp, &state.store, ctx)?;
            if value.to_boolean() {
                let target = ctx.resolve_label(label)?;
                Ok(StepResult::Next(State { control: target, ..state }))
            } else {
                advance(node.next, state)
            }
        }

        StmtKind::AssignAExp(register, expr) => {
            let value = eval(expr, state.fp, &state.store, ctx)?;
            let store = state.store.extend(Addr::frame(state.fp, register.clone()), value);
            advance(node.next, State { store, ..state })
        }

        StmtKind::FieldAssign(object, field, expr) => {
            let receiver = eval(object, state.fp, &state.store, ctx)?;
            let (class_name, ptr) = receiver.as_object()?;
            ctx.classes.lookup_field(class_name, field)?;
            let value = eval(expr, state.fp, &state.store, ctx)?;
            let store = state.store.extend(Addr::field(ptr, field.clone()), value);
            advance(node.next, State { store, ..state })
        }

        StmtKind::New(register, class_name) => {
            let ptr = ctx.fresh_object_pointer();
            debug!("new {class_name} -> {ptr:?}");
            let store = state
                .store
                .extend(Addr::frame(state.fp, register.clone()), Value::object(class_name.clone(), ptr));
            advance(node.next, State { store, ..state })
        }

        StmtKind::Invoke(register, object, method, args) => {
            let receiver = eval(object, state.fp, &state.store, ctx)?;
            let (class_name, _) = receiver.as_object()?;
            let method_def = ctx.classes.lookup_method(class_name, method)?;
            invoke(register, receiver, method_def, args, node.next, state, ctx)
        }

        StmtKind::InvokeSuper(register, method, args) => {
            let receiver = eval(&Expr::This, state.fp, &state.store, ctx)?;
            let (class_name, _) = receiver.as_object()?;
            let this_class = ctx.classes.get(class_name).ok_or_else(|| MachineError::NoSuchMember {
                class_name: class_name.to_string(),
                member: method.clone(),
                kind: MemberKind::Method,
            })?;
            let parent = this_class.parent.clone().ok_or_else(|| MachineError::NoSuchMember {
                class_name: class_name.to_string(),
                member: method.clone(),
                kind: MemberKind::Method,
            })?;
            let method_def = ctx.classes.lookup_method(&parent, method)?;
            invoke(register, receiver, method_def, args, node.next, state, ctx)
        }

        StmtKind::Return(expr) => {
            let value = eval(expr, state.fp, &state.store, ctx)?;
            match apply(&state.kont, value, state.store) {
                Applied::Halted { value, store } => Ok(StepResult::NormalHalt { value, store }),
                Applied::Resumed { resume, frame, store, kont } => {
                    Ok(StepResult::Next(State::new(resume, frame, store, kont)))
                }
                Applied::FellOff { store } => Ok(StepResult::FellOff { store }),
            }
        }

        StmtKind::PushHandler(catch_class, label) => {
            let kont = Rc::new(Kont::Handler {
                catch_class: catch_class.clone(),
                label: label.clone(),
                next: Rc::clone(&state.kont),
            });
            advance(node.next, State { kont, ..state })
        }

        StmtKind::PopHandler => {
            let kont = pop_handler(&state.kont)?;
            advance(node.next, State { kont, ..state })
        }

        StmtKind::Throw(expr) => {
            let exception = eval(expr, state.fp, &state.store, ctx)?;
            match handle(&state.kont, exception, state.fp, state.store, ctx)? {
                Handled::Uncaught { exception, store } => Ok(StepResult::UncaughtException { exception, store }),
                Handled::Resumed { resume, frame, store, kont } => {
                    Ok(StepResult::Next(State::new(resume, frame, store, kont)))
                }
            }
        }

        StmtKind::MoveException(register) => {
            let ex_addr = Addr::frame(state.fp, "$ex");
            let value = state
                .store
                .get(&ex_addr)
                .cloned()
                .ok_or_else(|| MachineError::UnboundAddr(ex_addr.clone()))?;
            let store = state.store.extend(Addr::frame(state.fp, register.clone()), value);
            advance(node.next, State { store, ..state })
        }

        StmtKind::Print(args) => {
            for arg in args {
                let value = eval(arg, state.fp, &state.store, ctx)?;
                writeln!(out, "{}", value.to_print())?;
            }
            advance(node.next, state)
        }
    }
}

/// Shared by `Invoke` and `InvokeSuper`: evaluate the arguments in the caller's
/// frame, mint a fresh callee frame, bind `$this` and the formals there, and push
/// an `Assign` continuation that resumes the caller when the callee returns.
fn invoke(
    register: &str,
    receiver: Value,
    method: &MethodDef,
    args: &[Expr],
    caller_next: Option<StmtId>,
    state: State,
    ctx: &MachineContext,
) -> Result<StepResult, MachineError> {
    let evaluated = args
        .iter()
        .map(|arg| eval(arg, state.fp, &state.store, ctx))
        .collect::<Result<Vec<Value>, MachineError>>()?;

    if evaluated.len() != method.params.len() {
        return Err(MachineError::TypeMismatch {
            expected: "matching argument count",
            found: format!("{} args for {} formals of '{}'", evaluated.len(), method.params.len(), method.name),
        });
    }

    let callee_fp = ctx.fresh_frame_pointer();
    debug!("invoke {} -> {callee_fp:?}", method.name);

    let mut store = state.store.extend(Addr::frame(callee_fp, THIS_REGISTER), receiver);
    for (param, value) in method.params.iter().zip(evaluated) {
        store = store.extend(Addr::frame(callee_fp, param.clone()), value);
    }

    let kont = Rc::new(Kont::Assign {
        register: register.to_string(),
        resume: caller_next,
        frame: state.fp,
        next: Rc::clone(&state.kont),
    });

    Ok(StepResult::Next(State::new(method.entry, callee_fp, store, kont)))
}
