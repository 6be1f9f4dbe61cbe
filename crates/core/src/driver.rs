//! Builds the initial state from a chosen main class and iterates `step` to
//! completion. Shared by the bundled CLI and by the end-to-end scenario tests.

use std::rc::Rc;

use log::{error, info};

use crate::context::MachineContext;
use crate::errors::{MachineError, SyntaxError};
use crate::kont::Kont;
use crate::parser::parse_file;
use crate::state::{step, State, StepResult};
use crate::store::Store;
use crate::value::Value;

/// The historical register name the driver binds the initial receiver at.
/// `ThisExp` reads `"$this"`, not `"this"` -- the mismatch is preserved verbatim
/// (see `DESIGN.md`), so a `main` body that reads `this` before any `invoke`
/// observes an unbound address rather than the object the driver just built.
const DRIVER_SELF_REGISTER: &str = "this";

/// The outcome of running a program to completion.
pub enum RunOutcome {
    NormalHalt { value: Value },
    UncaughtException { exception: Value },
}

/// Fatal errors that can prevent a program from even starting.
#[derive(Debug)]
pub enum DriverError {
    Syntax(SyntaxError),
    NoMainClass,
    Machine(MachineError),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DriverError::Syntax(e) => write!(f, "{e}"),
            DriverError::NoMainClass => write!(f, "error[0x106]: no class with a 'main' method was found"),
            DriverError::Machine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<SyntaxError> for DriverError {
    fn from(e: SyntaxError) -> Self {
        DriverError::Syntax(e)
    }
}

impl From<MachineError> for DriverError {
    fn from(e: MachineError) -> Self {
        DriverError::Machine(e)
    }
}

/// Parses every `(filename, source)` pair in order into `ctx`'s class database,
/// returning the class names in declaration order across all files (files and
/// then classes in declaration order within each file). The universal root
/// class is implicit in the bundled grammar (no program in the wild declares
/// `class Object { }` itself), so it is registered here if absent before any
/// file is parsed, and is not included in the returned order.
pub fn load(files: &[(String, String)], ctx: &mut MachineContext) -> Result<Vec<String>, DriverError> {
    if ctx.classes.get("Object").is_none() {
        ctx.classes.register(crate::class::ClassDef::new("Object", None));
    }
    let mut order = Vec::new();
    for (filename, source) in files {
        order.extend(parse_file(filename, source, ctx)?);
    }
    Ok(order)
}

/// The first class, in declaration order, whose method table contains `main`.
pub fn find_main_class<'a>(order: &[String], ctx: &'a MachineContext) -> Option<&'a str> {
    ctx.classes.find_main_class(order)
}

/// Builds the initial state for `main_class` and runs it to completion, writing
/// every `print`ed line to `out`.
pub fn run(main_class: &str, ctx: &MachineContext, out: &mut dyn std::io::Write) -> Result<RunOutcome, DriverError> {
    let class = ctx
        .classes
        .get(main_class)
        .ok_or(DriverError::NoMainClass)?;
    let main = class
        .methods
        .get("main")
        .ok_or(DriverError::NoMainClass)?;

    let op = ctx.fresh_object_pointer();
    let fp0 = ctx.fresh_frame_pointer();
    let receiver = Value::object(main_class, op);
    let store = Store::new().extend(crate::pointer::Addr::frame(fp0, DRIVER_SELF_REGISTER), receiver);

    info!("starting {main_class}.main at {fp0:?}");

    let mut state = State::new(main.entry, fp0, store, Rc::new(Kont::Halt));
    loop {
        match step(state, ctx, out) {
            Ok(StepResult::Next(next)) => state = next,
            Ok(StepResult::NormalHalt { value, .. }) => {
                info!("{main_class}.main returned normally");
                return Ok(RunOutcome::NormalHalt { value });
            }
            Ok(StepResult::FellOff { .. }) => {
                info!("{main_class}.main fell off the end of its body");
                return Ok(RunOutcome::NormalHalt { value: Value::Void });
            }
            Ok(StepResult::UncaughtException { exception, .. }) => {
                info!("{main_class}.main terminated on an uncaught exception");
                return Ok(RunOutcome::UncaughtException { exception });
            }
            Err(e) => {
                error!("{e}");
                return Err(e.into());
            }
        }
    }
}
