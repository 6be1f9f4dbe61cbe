//! The expression evaluator: pure, total (for well-formed input) evaluation of
//! atomic expressions against a frame pointer and a store.

use crate::ast::{Expr, Op};
use crate::context::MachineContext;
use crate::errors::MachineError;
use crate::pointer::{Addr, FramePointer};
use crate::store::Store;
use crate::value::Value;

/// `$this` is read through the ordinary register path, at address `(fp, "$this")`.
/// The historical driver binds the *initial* receiver at the bare register name
/// `"this"` (see `driver.rs`), so a program that reads `This` in `main`'s own frame,
/// before any `invoke`, hits this address unbound -- a behavior preserved verbatim
/// from the source machine rather than patched over (see `DESIGN.md`).
pub const THIS_REGISTER: &str = "$this";

pub fn eval(expr: &Expr, fp: FramePointer, store: &Store, ctx: &MachineContext) -> Result<Value, MachineError> {
    match expr {
        Expr::This => read_register(fp, THIS_REGISTER, store),
        Expr::Register(name) => read_register(fp, name, store),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Void => Ok(Value::Void),
        Expr::Field(obj, field) => {
            let receiver = eval(obj, fp, store, ctx)?;
            let (class_name, ptr) = receiver.as_object()?;
            ctx.classes.lookup_field(class_name, field)?;
            let addr = Addr::field(ptr, field.clone());
            store
                .get(&addr)
                .cloned()
                .ok_or(MachineError::UnboundAddr(addr))
        }
        Expr::InstanceOf(obj, class_name) => {
            let (obj_class, _) = eval(obj, fp, store, ctx)?.as_object()?;
            Ok(Value::Bool(ctx.classes.is_instance_of(obj_class, class_name)))
        }
        Expr::AtomicOp(op, args) => eval_atomic_op(*op, args, fp, store, ctx),
    }
}

fn read_register(fp: FramePointer, name: &str, store: &Store) -> Result<Value, MachineError> {
    let addr = Addr::frame(fp, name);
    store.get(&addr).cloned().ok_or(MachineError::UnboundAddr(addr))
}

fn eval_atomic_op(
    op: Op,
    args: &[Expr],
    fp: FramePointer,
    store: &Store,
    ctx: &MachineContext,
) -> Result<Value, MachineError> {
    match op {
        Op::Add => {
            let mut total = 0i32;
            for arg in args {
                total = total.wrapping_add(eval(arg, fp, store, ctx)?.to_int()?);
            }
            Ok(Value::Int(total))
        }
        Op::Mul => {
            let mut total = 1i32;
            for arg in args {
                total = total.wrapping_mul(eval(arg, fp, store, ctx)?.to_int()?);
            }
            Ok(Value::Int(total))
        }
        Op::Sub => {
            let (lhs, rhs) = binary_int_args(args, fp, store, ctx)?;
            Ok(Value::Int(lhs.wrapping_sub(rhs)))
        }
        Op::Eq => {
            let (lhs, rhs) = binary_int_args(args, fp, store, ctx)?;
            Ok(Value::Bool(lhs == rhs))
        }
    }
}

fn binary_int_args(
    args: &[Expr],
    fp: FramePointer,
    store: &Store,
    ctx: &MachineContext,
) -> Result<(i32, i32), MachineError> {
    if args.len() != 2 {
        return Err(MachineError::TypeMismatch {
            expected: "exactly 2 arguments",
            found: format!("{} arguments", args.len()),
        });
    }
    let lhs = eval(&args[0], fp, store, ctx)?.to_int()?;
    let rhs = eval(&args[1], fp, store, ctx)?.to_int()?;
    Ok((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtKind;

    fn setup() -> (MachineContext, FramePointer, Store) {
        let ctx = MachineContext::new();
        let fp = ctx.fresh_frame_pointer();
        (ctx, fp, Store::new())
    }

    #[test]
    fn add_with_no_args_is_zero() {
        let (ctx, fp, store) = setup();
        let result = eval(&Expr::AtomicOp(Op::Add, vec![]), fp, &store, &ctx).unwrap();
        assert_eq!(result, Value::Int(0));
    }

    #[test]
    fn mul_with_no_args_is_one() {
        let (ctx, fp, store) = setup();
        let result = eval(&Expr::AtomicOp(Op::Mul, vec![]), fp, &store, &ctx).unwrap();
        assert_eq!(result, Value::Int(1));
    }

    #[test]
    fn add_is_n_ary() {
        let (ctx, fp, store) = setup();
        let args = vec![Expr::Int(1), Expr::Int(2), Expr::Int(3)];
        let result = eval(&Expr::AtomicOp(Op::Add, args), fp, &store, &ctx).unwrap();
        assert_eq!(result, Value::Int(6));
    }

    #[test]
    fn eq_on_equal_ints_is_true() {
        let (ctx, fp, store) = setup();
        let args = vec![Expr::Int(5), Expr::Int(5)];
        let result = eval(&Expr::AtomicOp(Op::Eq, args), fp, &store, &ctx).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn sub_is_strictly_binary() {
        let (ctx, fp, store) = setup();
        let args = vec![Expr::Int(1)];
        assert!(eval(&Expr::AtomicOp(Op::Sub, args), fp, &store, &ctx).is_err());
    }

    #[test]
    fn reading_unbound_register_is_an_error() {
        let (ctx, fp, store) = setup();
        let err = eval(&Expr::Register("$missing".to_string()), fp, &store, &ctx).unwrap_err();
        assert!(matches!(err, MachineError::UnboundAddr(_)));
    }

    #[test]
    fn field_on_non_object_is_type_mismatch() {
        let (ctx, fp, store) = setup();
        let expr = Expr::Field(Box::new(Expr::Int(1)), "x".to_string());
        let err = eval(&expr, fp, &store, &ctx).unwrap_err();
        assert!(matches!(err, MachineError::TypeMismatch { .. }));
    }

    #[test]
    fn instance_of_walks_parent_chain() {
        let mut ctx = MachineContext::new();
        let entry = ctx.stmts.alloc(StmtKind::Skip, None);
        let _ = entry;
        ctx.classes.register(crate::class::ClassDef::new("Object", None));
        ctx.classes
            .register(crate::class::ClassDef::new("Box", Some("Object".to_string())));

        let fp = ctx.fresh_frame_pointer();
        let ptr = ctx.fresh_object_pointer();
        let store = Store::new().extend(Addr::frame(fp, "$b"), Value::object("Box", ptr));

        let expr = Expr::InstanceOf(Box::new(Expr::Register("$b".to_string())), "Object".to_string());
        let result = eval(&expr, fp, &store, &ctx).unwrap();
        assert_eq!(result, Value::Bool(true));
    }
}
