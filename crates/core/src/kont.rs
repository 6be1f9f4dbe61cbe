//! The continuation stack: a linked chain of return frames, handler frames, and the
//! unique `Halt` at the bottom. Frames are immutable and reference-counted, so
//! sharing a continuation between states (e.g. a handler installed above several
//! call frames) is just a clone of the `Rc`.

use std::rc::Rc;

use crate::ast::StmtId;
use crate::context::MachineContext;
use crate::errors::MachineError;
use crate::pointer::{Addr, FramePointer};
use crate::store::Store;
use crate::value::Value;

#[derive(Debug)]
pub enum Kont {
    Halt,
    Assign {
        register: String,
        /// The caller's statement following the call, or `None` if the call was the
        /// last statement in its body -- in which case a normal return from the
        /// callee falls off the end of the caller too.
        resume: Option<StmtId>,
        frame: FramePointer,
        next: Rc<Kont>,
    },
    Handler {
        catch_class: String,
        label: String,
        next: Rc<Kont>,
    },
}

/// The outcome of applying a continuation to a `return`ed value.
pub enum Applied {
    /// The machine has reached `Halt`: `value`/`store` are the observable result.
    Halted { value: Value, store: Store },
    /// Control resumes at `resume`, in `frame`, with `store` extended at `register`.
    Resumed {
        resume: StmtId,
        frame: FramePointer,
        store: Store,
        kont: Rc<Kont>,
    },
    /// The caller's own body had no successor after the call: execution falls off.
    FellOff { store: Store },
}

/// `apply(value, store)`: `Halt` terminates, `Assign` binds and resumes, `Handler`
/// is transparent -- it only ever intercepts on `handle`, never on a normal return.
pub fn apply(kont: &Rc<Kont>, value: Value, store: Store) -> Applied {
    match kont.as_ref() {
        Kont::Halt => Applied::Halted { value, store },
        Kont::Assign {
            register,
            resume,
            frame,
            next,
        } => {
            let store = store.extend(Addr::frame(*frame, register.clone()), value);
            match resume {
                Some(resume) => Applied::Resumed {
                    resume: *resume,
                    frame: *frame,
                    store,
                    kont: Rc::clone(next),
                },
                None => Applied::FellOff { store },
            }
        }
        Kont::Handler { next, .. } => apply(next, value, store),
    }
}

/// The outcome of unwinding the stack to find a handler for a thrown value.
pub enum Handled {
    /// No enclosing `Handler` matched: the exception is uncaught.
    Uncaught { exception: Value, store: Store },
    /// A matching handler was found: control resumes at its label, in the frame
    /// it was installed in, with `$ex` bound in that frame.
    Resumed {
        resume: StmtId,
        frame: FramePointer,
        store: Store,
        kont: Rc<Kont>,
    },
}

/// `handle(exception, fp, store)`. `fp` is threaded through unchanged across
/// `Assign` frames -- per the design's rationale, a handler resumes in the frame it
/// was installed in (the frame captured by the `Assign` above it in the chain, for
/// any handler installed at or above a caller), not in the frame that threw.
pub fn handle(
    kont: &Rc<Kont>,
    exception: Value,
    fp: FramePointer,
    store: Store,
    ctx: &MachineContext,
) -> Result<Handled, MachineError> {
    match kont.as_ref() {
        Kont::Halt => Ok(Handled::Uncaught { exception, store }),
        Kont::Assign { frame, next, .. } => handle(next, exception, *frame, store, ctx),
        Kont::Handler {
            catch_class,
            label,
            next,
        } => {
            let (class_name, _) = exception.as_object()?;
            if ctx.classes.is_instance_of(class_name, catch_class) {
                let resume = ctx.resolve_label(label)?;
                let store = store.extend(Addr::frame(fp, "$ex"), exception);
                // The handler frame stays on top of the continuation: the catch
                // body is responsible for removing it with an explicit
                // `popHandler`, matching `PopHandler`'s "top must be a Handler"
                // precondition.
                Ok(Handled::Resumed {
                    resume,
                    frame: fp,
                    store,
                    kont: Rc::clone(kont),
                })
            } else {
                handle(next, exception, fp, store, ctx)
            }
        }
    }
}

/// `popHandler`: removes the top frame, which must be a `Handler`.
pub fn pop_handler(kont: &Rc<Kont>) -> Result<Rc<Kont>, MachineError> {
    match kont.as_ref() {
        Kont::Handler { next, .. } => Ok(Rc::clone(next)),
        _ => Err(MachineError::KontMisuse(
            "popHandler applied to a continuation whose top frame is not a handler",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtKind;
    use crate::class::ClassDef;

    #[test]
    fn apply_on_halt_terminates() {
        let kont = Rc::new(Kont::Halt);
        match apply(&kont, Value::Int(1), Store::new()) {
            Applied::Halted { value, .. } => assert_eq!(value, Value::Int(1)),
            _ => panic!("expected Halted"),
        }
    }

    #[test]
    fn apply_skips_past_handler_frames() {
        let halt = Rc::new(Kont::Halt);
        let handler = Rc::new(Kont::Handler {
            catch_class: "E".to_string(),
            label: "L".to_string(),
            next: Rc::clone(&halt),
        });
        match apply(&handler, Value::Int(2), Store::new()) {
            Applied::Halted { value, .. } => assert_eq!(value, Value::Int(2)),
            _ => panic!("handlers must never catch a normal return"),
        }
    }

    #[test]
    fn apply_falls_off_when_assign_has_no_resume() {
        let halt = Rc::new(Kont::Halt);
        let assign = Rc::new(Kont::Assign {
            register: "$r".to_string(),
            resume: None,
            frame: FramePointer::from_counter(0),
            next: halt,
        });
        match apply(&assign, Value::Int(1), Store::new()) {
            Applied::FellOff { .. } => {}
            _ => panic!("expected FellOff"),
        }
    }

    #[test]
    fn pop_handler_requires_handler_on_top() {
        let halt = Rc::new(Kont::Halt);
        assert!(pop_handler(&halt).is_err());

        let handler = Rc::new(Kont::Handler {
            catch_class: "E".to_string(),
            label: "L".to_string(),
            next: Rc::clone(&halt),
        });
        let popped = pop_handler(&handler).unwrap();
        assert!(matches!(*popped, Kont::Halt));
    }

    #[test]
    fn handle_unwinds_to_matching_handler_and_binds_ex() {
        let mut ctx = MachineContext::new();
        let label_target = ctx.stmts.alloc(StmtKind::Skip, None);
        ctx.register_label("L", label_target);
        ctx.classes.register(ClassDef::new("Object", None));
        ctx.classes.register(ClassDef::new("E", Some("Object".to_string())));

        let fp = ctx.fresh_frame_pointer();
        let ptr = ctx.fresh_object_pointer();
        let exc = Value::object("E", ptr);

        let halt = Rc::new(Kont::Halt);
        let handler = Rc::new(Kont::Handler {
            catch_class: "E".to_string(),
            label: "L".to_string(),
            next: Rc::clone(&halt),
        });

        match handle(&handler, exc.clone(), fp, Store::new(), &ctx).unwrap() {
            Handled::Resumed { resume, frame, store, .. } => {
                assert_eq!(resume, label_target);
                assert_eq!(frame, fp);
                assert_eq!(store.get(&Addr::frame(fp, "$ex")), Some(&exc));
            }
            Handled::Uncaught { .. } => panic!("E should have matched the handler"),
        }
    }

    #[test]
    fn handle_on_halt_is_uncaught() {
        let ctx = MachineContext::new();
        let halt = Rc::new(Kont::Halt);
        let fp = ctx.fresh_frame_pointer();
        let exc = Value::Null;
        match handle(&halt, exc, fp, Store::new(), &ctx) {
            Ok(Handled::Uncaught { .. }) => {}
            _ => panic!("Halt must report the exception as uncaught"),
        }
    }

    #[test]
    fn handle_propagates_captured_frame_through_assign() {
        let mut ctx = MachineContext::new();
        let label_target = ctx.stmts.alloc(StmtKind::Skip, None);
        ctx.register_label("L", label_target);
        ctx.classes.register(ClassDef::new("Object", None));
        ctx.classes.register(ClassDef::new("E", Some("Object".to_string())));

        let caller_fp = ctx.fresh_frame_pointer();
        let callee_fp = ctx.fresh_frame_pointer();
        let resume_after_call = ctx.stmts.alloc(StmtKind::Skip, None);

        let halt = Rc::new(Kont::Halt);
        let handler = Rc::new(Kont::Handler {
            catch_class: "E".to_string(),
            label: "L".to_string(),
            next: Rc::clone(&halt),
        });
        let assign = Rc::new(Kont::Assign {
            register: "$r".to_string(),
            resume: Some(resume_after_call),
            frame: caller_fp,
            next: handler,
        });

        let ptr = ctx.fresh_object_pointer();
        let exc = Value::object("E", ptr);

        // Thrown from inside the callee frame, but the handler was installed in the
        // caller -- the handler must run with the caller's frame pointer.
        match handle(&assign, exc, callee_fp, Store::new(), &ctx).unwrap() {
            Handled::Resumed { frame, .. } => assert_eq!(frame, caller_fp),
            Handled::Uncaught { .. } => panic!("E should have matched the handler"),
        }
    }
}
