//! Literal rewrite pass
//!
//! Wraps every list display (`[a, b, c]`) in an [`Expr::Tracked`] node so the
//! interpreter builds an access-tracking list for it. Nothing else changes:
//! comprehensions, `list(...)`, slices and concatenation still produce plain
//! lists. Lists used as assignment targets (`[a, b] = pair`) are patterns,
//! not values, and are left alone.

use super::ast::{Comprehension, Expr, FStringPart, Program, Stmt};

/// Rewrite all list displays in `program` into tracked list constructions
pub fn track_list_literals(mut program: Program) -> Program {
    for stmt in &mut program.body {
        rewrite_stmt(stmt);
    }
    program
}

fn rewrite_block(body: &mut [Stmt]) {
    for stmt in body {
        rewrite_stmt(stmt);
    }
}

fn rewrite_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::Expr { expr, .. } => rewrite_expr(expr),
        Stmt::Assign { targets, value, .. } => {
            for target in targets {
                rewrite_target(target);
            }
            rewrite_expr(value);
        }
        Stmt::AugAssign { target, value, .. } => {
            rewrite_target(target);
            rewrite_expr(value);
        }
        Stmt::If {
            condition,
            body,
            orelse,
            ..
        } => {
            rewrite_expr(condition);
            rewrite_block(body);
            rewrite_block(orelse);
        }
        Stmt::While {
            condition, body, ..
        } => {
            rewrite_expr(condition);
            rewrite_block(body);
        }
        Stmt::For {
            target, iter, body, ..
        } => {
            rewrite_target(target);
            rewrite_expr(iter);
            rewrite_block(body);
        }
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                rewrite_expr(value);
            }
        }
        Stmt::FunctionDef { params, body, .. } => {
            for param in params {
                if let Some(default) = &mut param.default {
                    rewrite_expr(default);
                }
            }
            rewrite_block(body);
        }
        Stmt::ClassDef { base, body, .. } => {
            if let Some(base) = base {
                rewrite_expr(base);
            }
            rewrite_block(body);
        }
        Stmt::Raise { exception, .. } => {
            if let Some(exception) = exception {
                rewrite_expr(exception);
            }
        }
        Stmt::Assert {
            condition, message, ..
        } => {
            rewrite_expr(condition);
            if let Some(message) = message {
                rewrite_expr(message);
            }
        }
        Stmt::Delete { targets, .. } => {
            for target in targets {
                rewrite_target(target);
            }
        }
        Stmt::Break { .. }
        | Stmt::Continue { .. }
        | Stmt::Pass { .. }
        | Stmt::Global { .. }
        | Stmt::Import { .. }
        | Stmt::ImportFrom { .. } => {}
    }
}

/// Targets keep their list/tuple shape; only the value expressions inside
/// them (subscript indices, attribute owners) are rewritten
fn rewrite_target(target: &mut Expr) {
    match target {
        Expr::List { items, .. } | Expr::Tuple { items, .. } => {
            for item in items {
                rewrite_target(item);
            }
        }
        Expr::Subscript { object, index, .. } => {
            rewrite_expr(object);
            rewrite_expr(index);
        }
        Expr::Attribute { object, .. } => rewrite_expr(object),
        _ => {}
    }
}

fn rewrite_generators(generators: &mut [Comprehension]) {
    for generator in generators {
        rewrite_target(&mut generator.target);
        rewrite_expr(&mut generator.iter);
        for condition in &mut generator.conditions {
            rewrite_expr(condition);
        }
    }
}

fn rewrite_expr(expr: &mut Expr) {
    match expr {
        Expr::List { items, location } => {
            for item in items.iter_mut() {
                rewrite_expr(item);
            }
            let location = *location;
            let list = std::mem::replace(expr, Expr::NoneLiteral(location));
            *expr = Expr::Tracked {
                inner: Box::new(list),
                location,
            };
        }
        Expr::Tracked { .. }
        | Expr::NoneLiteral(_)
        | Expr::BoolLiteral(..)
        | Expr::IntLiteral(..)
        | Expr::FloatLiteral(..)
        | Expr::StringLiteral(..)
        | Expr::Name(..) => {}
        Expr::FString { parts, .. } => {
            for part in parts {
                if let FStringPart::Expr { expr, .. } = part {
                    rewrite_expr(expr);
                }
            }
        }
        Expr::Tuple { items, .. } | Expr::Set { items, .. } => {
            for item in items {
                rewrite_expr(item);
            }
        }
        Expr::Dict { entries, .. } => {
            for (key, value) in entries {
                rewrite_expr(key);
                rewrite_expr(value);
            }
        }
        Expr::ListComp {
            element,
            generators,
            ..
        } => {
            rewrite_expr(element);
            rewrite_generators(generators);
        }
        Expr::DictComp {
            key,
            value,
            generators,
            ..
        } => {
            rewrite_expr(key);
            rewrite_expr(value);
            rewrite_generators(generators);
        }
        Expr::BinaryOp { left, right, .. } | Expr::BoolOp { left, right, .. } => {
            rewrite_expr(left);
            rewrite_expr(right);
        }
        Expr::UnaryOp { operand, .. } => rewrite_expr(operand),
        Expr::Compare {
            left, comparisons, ..
        } => {
            rewrite_expr(left);
            for (_, right) in comparisons {
                rewrite_expr(right);
            }
        }
        Expr::IfExp {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            rewrite_expr(condition);
            rewrite_expr(then_expr);
            rewrite_expr(else_expr);
        }
        Expr::Lambda { params, body, .. } => {
            for param in params {
                if let Some(default) = &mut param.default {
                    rewrite_expr(default);
                }
            }
            rewrite_expr(body);
        }
        Expr::Call {
            func,
            args,
            keywords,
            ..
        } => {
            rewrite_expr(func);
            for arg in args {
                rewrite_expr(arg);
            }
            for keyword in keywords {
                rewrite_expr(&mut keyword.value);
            }
        }
        Expr::Attribute { object, .. } => rewrite_expr(object),
        Expr::Subscript { object, index, .. } => {
            rewrite_expr(object);
            rewrite_expr(index);
        }
        Expr::Slice {
            lower, upper, step, ..
        } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                rewrite_expr(bound);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn rewritten(source: &str) -> Program {
        track_list_literals(parse_program(source).unwrap())
    }

    #[test]
    fn test_list_display_is_wrapped() {
        let program = rewritten("a = [1, 2, 3]\n");
        match &program.body[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Tracked { inner, .. } => {
                    assert!(matches!(**inner, Expr::List { ref items, .. } if items.len() == 3))
                }
                _ => panic!("Expected tracked list"),
            },
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_nested_lists_are_wrapped() {
        let program = rewritten("grid = [[0, 1], [2, 3]]\n");
        match &program.body[0] {
            Stmt::Assign {
                value: Expr::Tracked { inner, .. },
                ..
            } => match &**inner {
                Expr::List { items, .. } => {
                    assert!(items.iter().all(|i| matches!(i, Expr::Tracked { .. })))
                }
                _ => panic!("Expected list"),
            },
            _ => panic!("Expected tracked assignment"),
        }
    }

    #[test]
    fn test_comprehension_stays_plain() {
        let program = rewritten("a = [x for x in range(3)]\n");
        assert!(matches!(
            &program.body[0],
            Stmt::Assign {
                value: Expr::ListComp { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_list_target_is_not_wrapped() {
        let program = rewritten("[a, b] = [1, 2]\n");
        match &program.body[0] {
            Stmt::Assign { targets, value, .. } => {
                assert!(matches!(targets[0], Expr::List { .. }));
                assert!(matches!(value, Expr::Tracked { .. }));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_lists_inside_functions_are_wrapped() {
        let program = rewritten("def f():\n    return [1]\n");
        match &program.body[0] {
            Stmt::FunctionDef { body, .. } => assert!(matches!(
                &body[0],
                Stmt::Return {
                    value: Some(Expr::Tracked { .. }),
                    ..
                }
            )),
            _ => panic!("Expected function"),
        }
    }
}
